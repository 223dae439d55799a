mod common;
mod sink;
