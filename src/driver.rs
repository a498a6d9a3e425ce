//! Orchestration: cache → catalog → exporter.

use anyhow::{Context, Result};

use crate::catalog::{CatalogClient, Constraints, FIND_OUTFIELDS, RETRIEVE_INCLUDE};
use crate::data::model::SpectrumTable;
use crate::data::store::SpectrumCache;
use crate::export::{ExportMode, ExportSummary, Exporter};

/// Runs one retrieval against a catalog, backed by a local cache.
pub struct Driver<C> {
    client: C,
    cache: SpectrumCache,
}

impl<C: CatalogClient> Driver<C> {
    pub fn new(client: C, cache: SpectrumCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &SpectrumCache {
        &self.cache
    }

    /// Return the cached table if present, otherwise query the catalog and
    /// cache the result.
    ///
    /// A cache hit never contacts the catalog, whatever `constraints` say.
    /// Empty results are returned but not cached.
    pub fn fetch(&self, constraints: &Constraints, limit: Option<usize>) -> Result<SpectrumTable> {
        if let Some(table) = self.cache.load()? {
            log::info!(
                "Already found cache {} with {} spectra",
                self.cache.path().display(),
                table.len()
            );
            return Ok(table);
        }

        log::info!("Filtering by {constraints}");
        let ids = self
            .client
            .find(FIND_OUTFIELDS, constraints, limit)
            .context("catalog find failed")?;
        log::info!("found {} matching spectra", ids.len());

        if ids.is_empty() {
            log::warn!("query matched no spectra; nothing cached");
            return Ok(SpectrumTable::default());
        }

        let records = self
            .client
            .retrieve(&ids, RETRIEVE_INCLUDE, &constraints.data_release, limit)
            .context("catalog retrieve failed")?;
        log::info!("Retrieved {} spectra for {constraints}", records.len());

        let table = SpectrumTable::from_records(records);
        if table.is_empty() {
            log::warn!("retrieve returned no spectra; nothing cached");
            return Ok(table);
        }
        self.cache.store(&table)?;
        log::info!("cached {} spectra in {}", table.len(), self.cache.path().display());
        Ok(table)
    }

    /// Export `table` in each of `modes`.
    pub fn export(
        &self,
        table: &SpectrumTable,
        modes: &[ExportMode],
        exporter: &Exporter,
    ) -> Result<ExportSummary> {
        let summary = exporter
            .export_all(table, modes)
            .context("export failed")?;
        if !summary.skipped.is_empty() {
            log::warn!("{} exports skipped (empty grid)", summary.skipped.len());
        }
        Ok(summary)
    }
}
