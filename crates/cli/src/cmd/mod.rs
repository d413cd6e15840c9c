pub mod create;
pub mod installation;
