// Record stores for the booking workbooks
//
// Each record kind lives in one sheet; `SheetStore<E>` provides cached
// reads and whole-file rewrites for any `Entity`. Clients, hotels and
// quotations are the concrete kinds.

pub mod aggregate;
pub mod cache;
pub mod client;
pub mod entity;
pub mod error;
pub mod hotel;
pub mod quotation;
pub mod rates;
pub mod schema;
pub mod store;

use std::collections::BTreeMap;

use lahimena_config::Settings;

pub use aggregate::{grand_total, group_quotations, GroupBy, QuotationGroup};
pub use cache::{get_or_load, CacheKey, CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use client::{Client, ClientFilter, Rooming};
pub use entity::Entity;
pub use error::{RateError, StoreError};
pub use hotel::{Hotel, HotelFilter};
pub use quotation::{Quotation, QuotationFilter};
pub use rates::{convert, Currency, ExchangeRates, RateService};
pub use store::SheetStore;

/// Every store the application uses, configured from one [`Settings`]
pub struct Stores {
    pub clients: SheetStore<Client>,
    pub hotels: SheetStore<Hotel>,
    pub quotations: SheetStore<Quotation>,
    pub rates: RateService,
}

impl Stores {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            clients: SheetStore::clients(settings),
            hotels: SheetStore::hotels(settings),
            quotations: SheetStore::quotations(settings),
            rates: RateService::from_settings(&settings.rates, settings.rate_ttl()),
        }
    }

    /// Stats per cache namespace
    pub fn cache_stats(&self) -> BTreeMap<&'static str, CacheStats> {
        BTreeMap::from([
            (Client::KIND, self.clients.cache_stats()),
            (Hotel::KIND, self.hotels.cache_stats()),
            (Quotation::KIND, self.quotations.cache_stats()),
            (RateService::CACHE_PREFIX, self.rates.cache_stats()),
        ])
    }

    pub fn clear_caches(&self) {
        self.clients.clear_cache();
        self.hotels.clear_cache();
        self.quotations.clear_cache();
        self.rates.clear_cache();
    }
}
