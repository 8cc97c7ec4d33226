//! TCP server glue: the accept loop that hands sockets to per-connection
//! pipelines. The engine itself never owns a socket; everything here is thin
//! wiring over tokio.

pub mod listener;
