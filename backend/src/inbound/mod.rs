//! Inbound adapters translating external requests into lifecycle calls while
//! keeping framework details at the edge.

pub mod http;
