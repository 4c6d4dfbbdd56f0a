use tokio::sync::mpsc::{self, error::TrySendError};

/// What a route does when its consumer has fallen behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait for capacity. The route never loses items.
    Block,
    /// Drop the item for this route only, logging and counting the drop.
    DropNewest,
}

struct Route<T> {
    name: &'static str,
    sender: mpsc::Sender<T>,
    policy: OverflowPolicy,
    dropped: u64,
}

/// Single-producer fan-out: every broadcast item is delivered to each route's
/// own bounded channel, so each consumer reads at its own pace.
pub struct StreamRouter<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for StreamRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StreamRouter<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Attaches an existing channel, e.g. one that outlives this router.
    pub fn add_route(
        &mut self,
        name: &'static str,
        sender: mpsc::Sender<T>,
        policy: OverflowPolicy,
    ) {
        self.routes.push(Route {
            name,
            sender,
            policy,
            dropped: 0,
        });
    }

    /// Creates a new bounded route and returns its consumer end.
    pub fn subscribe(
        &mut self,
        name: &'static str,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> mpsc::Receiver<T> {
        let (sender, receiver) = mpsc::channel(capacity);
        self.add_route(name, sender, policy);
        receiver
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Items dropped so far on the named route.
    pub fn dropped(&self, name: &str) -> Option<u64> {
        self.routes
            .iter()
            .find(|route| route.name == name)
            .map(|route| route.dropped)
    }
}

impl<T: Clone> StreamRouter<T> {
    /// Delivers `item` to every open route, in registration order. Routes
    /// whose consumer has gone away are removed. Returns how many routes
    /// accepted the item.
    pub async fn broadcast(&mut self, item: T) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (index, route) in self.routes.iter_mut().enumerate() {
            let sent = match route.policy {
                OverflowPolicy::Block => route.sender.send(item.clone()).await.is_ok(),
                OverflowPolicy::DropNewest => match route.sender.try_send(item.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        route.dropped += 1;
                        tracing::warn!(
                            "Dropping item on route {}: consumer is behind ({} dropped)",
                            route.name,
                            route.dropped
                        );
                        continue;
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
            };
            if sent {
                delivered += 1;
            } else {
                closed.push(index);
            }
        }
        for index in closed.into_iter().rev() {
            let route = self.routes.remove(index);
            tracing::debug!("Route {} closed, removing it", route.name);
        }
        delivered
    }
}
