use std::sync::Arc;

use crate::gateway::RequestGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RequestGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }
}
