use context_bridge::QueryRequest;

/// Everything the transport can ask the controller to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    Connect {
        connection_id: String,
    },
    Disconnect {
        connection_id: String,
    },
    Query {
        connection_id: String,
        request: QueryRequest,
    },
}

impl RouteEvent {
    pub fn connection_id(&self) -> &str {
        match self {
            RouteEvent::Connect { connection_id }
            | RouteEvent::Disconnect { connection_id }
            | RouteEvent::Query { connection_id, .. } => connection_id,
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            RouteEvent::Connect { .. } => "connect",
            RouteEvent::Disconnect { .. } => "disconnect",
            RouteEvent::Query { .. } => "query",
        }
    }
}
