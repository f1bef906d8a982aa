#![allow(dead_code)]

pub mod config;
pub mod mock_baidu;
pub mod server;
