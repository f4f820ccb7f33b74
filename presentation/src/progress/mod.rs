//! Progress reporting for streamed replies

pub mod reporter;
