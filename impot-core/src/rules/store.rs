use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::RuleTableError;
use crate::models::RuleTables;

/// Where rule tables come from. The data crate ships one reading CSV/TOML
/// files from a directory and one serving the compiled-in official tables.
pub trait RuleTableSource: Send + Sync {
    /// Loads and validates the tables of `tax_year`.
    ///
    /// # Errors
    /// * [`RuleTableError::UnknownTaxYear`] when the source has no data for
    ///   that year.
    /// * Any validation error of the loaded tables.
    fn load(
        &self,
        tax_year: i32,
    ) -> Result<RuleTables, RuleTableError>;

    /// Years this source can load, ascending.
    fn available_years(&self) -> Vec<i32>;
}

/// Load-once cache of rule tables, keyed by tax year.
///
/// Tables are loaded from the source on first use and shared as
/// `Arc<RuleTables>` afterwards; an entry is never replaced once inserted.
/// Concurrent first requests for the same year load it exactly once.
pub struct RuleTableStore {
    source: Box<dyn RuleTableSource>,
    loaded: RwLock<HashMap<i32, Arc<RuleTables>>>,
}

impl RuleTableStore {
    pub fn new(source: Box<dyn RuleTableSource>) -> Self {
        Self {
            source,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Tables for `tax_year`, loading them on first request.
    ///
    /// # Errors
    /// Whatever the source reports, plus [`RuleTableError::YearMismatch`]
    /// when it returns tables of another year. Failed loads are not cached.
    pub fn get(
        &self,
        tax_year: i32,
    ) -> Result<Arc<RuleTables>, RuleTableError> {
        if let Some(tables) = self.read_cached(tax_year) {
            return Ok(tables);
        }

        let mut loaded = self
            .loaded
            .write()
            .map_err(|_| RuleTableError::Source("rule table cache poisoned".to_string()))?;
        // Another caller may have loaded the year while we waited for the lock.
        if let Some(tables) = loaded.get(&tax_year) {
            return Ok(Arc::clone(tables));
        }

        let tables = self.source.load(tax_year)?;
        if tables.tax_year != tax_year {
            return Err(RuleTableError::YearMismatch {
                requested: tax_year,
                found: tables.tax_year,
            });
        }
        tables.validate()?;
        debug!(tax_year, brackets = tables.brackets.brackets().len(), "rule tables loaded");

        let tables = Arc::new(tables);
        loaded.insert(tax_year, Arc::clone(&tables));
        Ok(tables)
    }

    /// Years the underlying source offers.
    pub fn available_years(&self) -> Vec<i32> {
        self.source.available_years()
    }

    /// Years already loaded into the cache, ascending.
    pub fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .loaded
            .read()
            .map(|loaded| loaded.keys().copied().collect())
            .unwrap_or_default();
        years.sort_unstable();
        years
    }

    fn read_cached(
        &self,
        tax_year: i32,
    ) -> Option<Arc<RuleTables>> {
        self.loaded
            .read()
            .ok()
            .and_then(|loaded| loaded.get(&tax_year).map(Arc::clone))
    }
}

impl std::fmt::Debug for RuleTableStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RuleTableStore")
            .field("cached_years", &self.cached_years())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tests
// ─────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::tables_2024;

    // ── stub source ──────────────────────────────────────────────────────
    // Serves the 2024 tables for any year it knows and counts the loads.
    struct CountingSource {
        loads: Arc<AtomicUsize>,
        reported_year: Option<i32>,
    }

    impl RuleTableSource for CountingSource {
        fn load(
            &self,
            tax_year: i32,
        ) -> Result<RuleTables, RuleTableError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if tax_year != 2024 {
                return Err(RuleTableError::UnknownTaxYear(tax_year));
            }
            let mut tables = tables_2024();
            if let Some(year) = self.reported_year {
                tables.tax_year = year;
            }
            Ok(tables)
        }

        fn available_years(&self) -> Vec<i32> {
            vec![2024]
        }
    }

    fn store() -> (RuleTableStore, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            loads: Arc::clone(&loads),
            reported_year: None,
        };
        (RuleTableStore::new(Box::new(source)), loads)
    }

    #[test]
    fn get_loads_once_and_caches() {
        let (store, loads) = store();

        let first = store.get(2024).unwrap();
        let second = store.get(2024).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.cached_years(), vec![2024]);
    }

    #[test]
    fn unknown_year_is_reported_and_not_cached() {
        let (store, loads) = store();

        assert_eq!(store.get(1999), Err(RuleTableError::UnknownTaxYear(1999)));
        assert_eq!(store.get(1999), Err(RuleTableError::UnknownTaxYear(1999)));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(store.cached_years().is_empty());
    }

    #[test]
    fn tables_of_another_year_are_rejected() {
        let source = CountingSource {
            loads: Arc::new(AtomicUsize::new(0)),
            reported_year: Some(2023),
        };
        let store = RuleTableStore::new(Box::new(source));

        assert_eq!(
            store.get(2024),
            Err(RuleTableError::YearMismatch {
                requested: 2024,
                found: 2023,
            })
        );
    }

    #[test]
    fn concurrent_first_requests_load_once() {
        let (store, loads) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.get(2024).map(|t| t.tax_year))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(2024));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn available_years_come_from_source() {
        let (store, _) = store();

        assert_eq!(store.available_years(), vec![2024]);
    }
}
