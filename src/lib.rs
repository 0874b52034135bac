// nexus-fabric-core/src/lib.rs - Core library for the fabric orchestrator

pub mod fabric_proto {
    pub mod fabric {
        include!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/fabric_proto/fabric.rs"));
    }
}

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod manager;
pub mod proxy;
pub mod pruner;
pub mod runtime;
pub mod server;
pub mod state;

pub use config::{NexusConfig, ProxyConfig};
pub use error::{FabricError, FabricResult};
pub use manager::FabricManager;
pub use server::{spawn_server, spawn_server_with_shutdown, FabricServiceServerImpl};
