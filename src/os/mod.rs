cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub(crate) mod windows;
        pub use windows::OsBackend;
    } else if #[cfg(unix)] {
        pub(crate) mod unix;
        pub use unix::OsBackend;
    } else {
        compile_error!("unsupported platform: no mapping backend");
    }
}
