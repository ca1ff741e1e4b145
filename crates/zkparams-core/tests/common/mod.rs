#![allow(dead_code)]

pub mod param_server;
