// 服务器模块入口
// Listener creation, accept loop, request head checks, connection serving and shutdown signals

pub mod connection;
pub mod guard;
pub mod listener;
pub mod signal;

// Rust 不允许 loop 作为模块名（关键字），改用 server_loop
#[path = "loop.rs"]
pub mod server_loop;

// 重新导出常用类型
pub use listener::create_listener;
pub use server_loop::run;
pub use signal::shutdown_signal;
