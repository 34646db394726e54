use crate::{
    db_types::{Item, ItemId, NewItem},
    traits::MarketplaceError,
};

/// The read/seed boundary onto the item catalogue.
///
/// The marketplace's catalogue CRUD (owner edits, image uploads, search) lives outside this engine. The core only
/// needs to look items up before reserving stock, and test/seed tooling needs to create them.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    /// Creates a catalogue item. Fails if the item id is already taken.
    async fn insert_item(&self, item: NewItem) -> Result<Item, MarketplaceError>;

    /// Fetches an item by id, including its live quantity and status.
    async fn fetch_item(&self, item_id: &ItemId) -> Result<Option<Item>, MarketplaceError>;
}
