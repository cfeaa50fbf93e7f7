mod server;

pub(crate) use server::gateway_error_to_status;
pub(crate) use server::RpcServer;
