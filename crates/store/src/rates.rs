// Ariary exchange rates and currency conversion
//
// Rates are quoted as Ariary per unit of foreign currency. The HTTP source
// returns the inverse (units per Ariary) and is converted on fetch.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lahimena_config::RateSettings;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{get_or_load, CacheKey, CacheStats, Clock, SystemClock, TtlCache};
use crate::error::RateError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExchangeRates {
    /// Ariary per euro
    pub eur: f64,
    /// Ariary per US dollar
    pub usd: f64,
}

impl ExchangeRates {
    pub fn from_settings(settings: &RateSettings) -> Self {
        Self { eur: settings.fallback_eur, usd: settings.fallback_usd }
    }

    /// Ariary per unit of `currency`
    pub fn ariary_per(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Ariary => 1.0,
            Currency::Euro => self.eur,
            Currency::DollarUs => self.usd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Currency {
    Ariary,
    Euro,
    DollarUs,
}

impl Currency {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ariary => "Ariary",
            Self::Euro => "Euro",
            Self::DollarUs => "Dollar US",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ariary" | "mga" | "ar" => Ok(Self::Ariary),
            "euro" | "eur" | "€" => Ok(Self::Euro),
            "dollar us" | "dollar" | "usd" | "$" => Ok(Self::DollarUs),
            _ => Err(format!("unknown currency '{}'", s.trim())),
        }
    }
}

/// Convert through the Ariary base. Same-currency conversion is exact.
pub fn convert(amount: f64, from: Currency, to: Currency, rates: &ExchangeRates) -> f64 {
    if from == to {
        return amount;
    }
    let ariary = amount * rates.ariary_per(from);
    let divisor = rates.ariary_per(to);
    if divisor == 0.0 {
        return 0.0;
    }
    ariary / divisor
}

pub trait RateSource: Send + Sync {
    fn fetch(&self) -> Result<ExchangeRates, RateError>;
}

/// Always returns the same rates
#[derive(Debug, Clone, Copy)]
pub struct FixedRates(pub ExchangeRates);

impl RateSource for FixedRates {
    fn fetch(&self) -> Result<ExchangeRates, RateError> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// JSON endpoint with MGA as base currency
pub struct HttpRateSource {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpRateSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RateError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("lahimena/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Network(e.to_string()))?;
        Ok(Self { http, endpoint: endpoint.to_string() })
    }
}

impl RateSource for HttpRateSource {
    fn fetch(&self) -> Result<ExchangeRates, RateError> {
        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .map_err(|e| RateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateError::Http(response.status().as_u16()));
        }

        let body: RatesResponse = response.json().map_err(|e| RateError::Parse(e.to_string()))?;
        parse_rates(&body.rates)
    }
}

/// Invert per-Ariary quotes into Ariary-per-unit rates
fn parse_rates(rates: &HashMap<String, f64>) -> Result<ExchangeRates, RateError> {
    let invert = |code: &str| -> Result<f64, RateError> {
        match rates.get(code) {
            Some(v) if *v > 0.0 && v.is_finite() => Ok(1.0 / v),
            Some(v) => Err(RateError::Parse(format!("rate for {code} is {v}"))),
            None => Err(RateError::Parse(format!("no rate for {code}"))),
        }
    };
    Ok(ExchangeRates { eur: invert("EUR")?, usd: invert("USD")? })
}

/// Cached rate lookup with a configured fallback.
///
/// A failed fetch caches the fallback for the same TTL, so an unreachable
/// endpoint is retried once per TTL rather than on every call.
pub struct RateService {
    source: Box<dyn RateSource>,
    fallback: ExchangeRates,
    ttl: Duration,
    cache: Mutex<TtlCache<CacheKey, ExchangeRates>>,
}

impl RateService {
    pub const CACHE_PREFIX: &'static str = "exchange_rates";

    pub fn new(source: Box<dyn RateSource>, fallback: ExchangeRates, ttl: Duration) -> Self {
        Self::with_clock(source, fallback, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Box<dyn RateSource>, fallback: ExchangeRates, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            fallback,
            ttl,
            cache: Mutex::new(TtlCache::with_clock(Self::CACHE_PREFIX, clock)),
        }
    }

    /// HTTP source from settings; if the client cannot be built the
    /// fallback rates are served
    pub fn from_settings(settings: &RateSettings, ttl: Duration) -> Self {
        let fallback = ExchangeRates::from_settings(settings);
        let source: Box<dyn RateSource> =
            match HttpRateSource::new(&settings.endpoint, Duration::from_secs(settings.timeout_secs)) {
                Ok(source) => Box::new(source),
                Err(e) => {
                    log::warn!("Exchange rate client unavailable ({}); using fixed rates", e);
                    Box::new(FixedRates(fallback))
                }
            };
        Self::new(source, fallback, ttl)
    }

    /// Cached rates. The fetch runs without holding the cache lock.
    pub fn rates(&self) -> ExchangeRates {
        let key = CacheKey::new(Self::CACHE_PREFIX);
        get_or_load(&self.cache, key, self.ttl, || Ok::<_, Infallible>(self.fetch_or_fallback()))
            .unwrap_or_else(|never| match never {})
    }

    fn fetch_or_fallback(&self) -> ExchangeRates {
        match self.source.fetch() {
            Ok(rates) => {
                log::info!("Exchange rates: 1 EUR = {:.2} Ar, 1 USD = {:.2} Ar", rates.eur, rates.usd);
                rates
            }
            Err(e) => {
                log::warn!("Exchange rate fetch failed ({}); using fallback rates", e);
                self.fallback
            }
        }
    }

    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            return amount;
        }
        convert(amount, from, to, &self.rates())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RATES: ExchangeRates = ExchangeRates { eur: 5000.0, usd: 4500.0 };

    struct Counting {
        calls: Arc<AtomicUsize>,
        result: Option<ExchangeRates>,
    }

    impl RateSource for Counting {
        fn fetch(&self) -> Result<ExchangeRates, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.ok_or(RateError::Http(503))
        }
    }

    fn service(result: Option<ExchangeRates>, clock: Arc<ManualClock>) -> (RateService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Box::new(Counting { calls: calls.clone(), result });
        let fallback = ExchangeRates { eur: 5235.0, usd: 4900.0 };
        (RateService::with_clock(source, fallback, Duration::from_secs(60), clock), calls)
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(10.0, Currency::Euro, Currency::Ariary, &RATES), 50_000.0);
        assert_eq!(convert(9_000.0, Currency::Ariary, Currency::DollarUs, &RATES), 2.0);
        assert_eq!(convert(9.0, Currency::Euro, Currency::DollarUs, &RATES), 10.0);
        assert_eq!(convert(3.3, Currency::Euro, Currency::Euro, &RATES), 3.3);
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!("Dollar US".parse::<Currency>(), Ok(Currency::DollarUs));
        assert_eq!(" EUR ".parse::<Currency>(), Ok(Currency::Euro));
        assert_eq!("mga".parse::<Currency>(), Ok(Currency::Ariary));
        assert!("yen".parse::<Currency>().is_err());
    }

    #[test]
    fn test_parse_rates_inverts() {
        let body: RatesResponse =
            serde_json::from_str(r#"{"base":"MGA","rates":{"EUR":0.0002,"USD":0.00025,"MGA":1}}"#).unwrap();
        let rates = parse_rates(&body.rates).unwrap();
        assert!((rates.eur - 5000.0).abs() < 1e-6);
        assert!((rates.usd - 4000.0).abs() < 1e-6);

        let missing: HashMap<String, f64> = [("EUR".to_string(), 0.0002)].into_iter().collect();
        assert!(matches!(parse_rates(&missing), Err(RateError::Parse(_))));
    }

    #[test]
    fn test_rates_cached_until_ttl() {
        let clock = Arc::new(ManualClock::new());
        let (svc, calls) = service(Some(RATES), clock.clone());

        assert_eq!(svc.rates(), RATES);
        assert_eq!(svc.rates(), RATES);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(61));
        svc.rates();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fallback_on_failure() {
        let clock = Arc::new(ManualClock::new());
        let (svc, calls) = service(None, clock);
        assert_eq!(svc.rates(), ExchangeRates { eur: 5235.0, usd: 4900.0 });
        svc.rates();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.convert(2.0, Currency::Euro, Currency::Ariary), 10_470.0);
    }

    struct Gated {
        started: std::sync::mpsc::Sender<()>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl RateSource for Gated {
        fn fetch(&self) -> Result<ExchangeRates, RateError> {
            let _ = self.started.send(());
            let _ = self.release.lock().recv();
            Ok(RATES)
        }
    }

    #[test]
    fn test_cache_usable_during_fetch() {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let source = Box::new(Gated { started: started_tx, release: Mutex::new(release_rx) });
        let svc = RateService::new(source, RATES, Duration::from_secs(60));

        std::thread::scope(|s| {
            let fetch = s.spawn(|| svc.rates());
            started_rx.recv().unwrap();
            assert!(svc.cache.try_lock().is_some());
            svc.clear_cache();
            release_tx.send(()).unwrap();
            assert_eq!(fetch.join().unwrap(), RATES);
        });

        // cleared while fetching, so the result was not kept
        assert_eq!(svc.cache_stats().size, 0);
    }
}
