mod command;
mod config;
mod insert;
mod preview;
mod server;
mod tree;
