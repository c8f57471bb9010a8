pub mod memory;
pub mod seed;
pub mod stores;

pub use memory::MemoryClientStore;
pub use seed::{
    fmt_datetime, seed_document, seed_main_account, seed_message, seed_sub_account, seed_ticket,
};
pub use stores::{TestStores, create_test_stores};

#[cfg(test)]
mod tests {
    use super::*;
    use quillsign_core::PortalBackend;

    #[tokio::test]
    async fn test_stores_are_usable() {
        let stores = create_test_stores().await;

        let result = stores.backend.list_sub_accounts("nobody").await.unwrap();
        assert!(result.is_empty());
    }
}
