use herald::{CommandContext, CommandError, FixedMembership, ReplicaAddress, ReplicaConfig, Role};
use slog::Drain;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

const USAGE: &str = "Usage: herald <listen-addr> [peer-addr...]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let listen_address: SocketAddr = args.next().ok_or(USAGE)?.parse()?;
    let peers: Vec<ReplicaAddress> = args.map(ReplicaAddress::new).collect();

    let logger = create_root_logger_for_stdout();
    let shutdown = herald::install_shutdown_handler(logger.clone());

    let membership = FixedMembership::new(ReplicaAddress::new(listen_address.to_string()), peers);
    let replica = herald::try_create_replica(ReplicaConfig {
        info_logger: logger.clone(),
        membership: Arc::new(membership),
        listen_address,
        options: Default::default(),
        shutdown: shutdown.clone(),
    })
    .await?;

    let command_logger = logger.clone();
    replica.register_command("announce", move |ctx: CommandContext, payload: bytes::Bytes| {
        let logger = command_logger.clone();
        async move {
            slog::info!(
                logger,
                "Leader announced itself: {} (I'm {} of {} replicas)",
                String::from_utf8_lossy(&payload),
                ctx.my_role,
                ctx.replica_count
            );
            Ok::<(), CommandError>(())
        }
    });

    let mut role_listener = replica.role_listener();
    loop {
        tokio::select! {
            role = role_listener.next() => match role {
                Some(Role::Leader) => {
                    slog::info!(logger, "Became leader in term {}", replica.current_term());
                    let payload = replica.my_address().to_string();
                    if let Err(e) = replica.execute_command("announce", payload).await {
                        slog::warn!(logger, "Announcement failed: {}", e);
                    }
                }
                Some(role) => slog::info!(logger, "Now {}", role),
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }

    replica.join().await;
    Ok(())
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
