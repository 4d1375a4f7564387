mod trade_api;

pub use trade_api::TradeApiClient;
