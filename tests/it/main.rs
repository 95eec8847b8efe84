mod support;

mod http_live;
mod http_sessions;
mod ws_transport;
