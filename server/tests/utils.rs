use kvstore_server_node::server::{ServerConfig, ServerNode};
use kvstore_server_node::store::Store;
use rocket::local::asynchronous::Client as AsyncClient;
use rocket::local::blocking::Client;
use std::sync::Arc;

pub fn get_server_config(port: u16) -> ServerConfig {
    ServerConfig {
        port,
        shard_count: 4,
        ..ServerConfig::default()
    }
}

pub fn launch_server_node() -> (ServerNode, Client) {
    let store = Arc::new(Store::with_shards(4));
    let node = ServerNode::new(get_server_config(8080), store);
    let client = Client::tracked(node.build()).expect("valid rocket instance");
    (node, client)
}

pub async fn launch_server_node_async() -> (ServerNode, AsyncClient) {
    let store = Arc::new(Store::new());
    let node = ServerNode::new(get_server_config(8080), store);
    let client = AsyncClient::tracked(node.build())
        .await
        .expect("valid rocket instance");
    (node, client)
}
