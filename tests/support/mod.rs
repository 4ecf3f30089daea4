#![allow(dead_code)]

pub mod decoder;
pub mod synthetic;
