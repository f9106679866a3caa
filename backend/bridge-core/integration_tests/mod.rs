mod client;
mod end_to_end;
mod helpers;
mod lifecycle;
mod server;
