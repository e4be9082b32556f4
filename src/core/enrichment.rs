//! Batched re-enrichment after presentation changes

use log::{debug, info};
use marine_sens_core::constants::ENRICHMENT_DEBOUNCE_CEILING_MS;
use marine_sens_core::{ConversionError, ConversionRegistry, Debouncer};
use marine_sens_types::PresentationConfig;
use std::sync::Arc;

/// Something holding enriched metrics that can be re-derived in one pass
pub trait EnrichmentTarget {
    /// Re-enrich every live metric under `presentation`
    ///
    /// Returns the number of sensor instances touched. Implementations must
    /// finish the whole pass before returning.
    fn re_enrich_all(&mut self, presentation: &PresentationConfig) -> usize;
}

/// Result of one batch pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReEnrichmentReport {
    pub instances: usize,
    pub presentation: PresentationConfig,
}

/// Coalesces presentation changes into a single pass over all instances
pub struct ReEnrichmentCoordinator {
    conversions: Arc<ConversionRegistry>,
    debouncer: Debouncer,
    current: PresentationConfig,
    pending: Option<PresentationConfig>,
    batches: u64,
}

impl ReEnrichmentCoordinator {
    /// `debounce_ms` is capped at the 100 ms batch deadline
    pub fn new(
        conversions: Arc<ConversionRegistry>,
        current: PresentationConfig,
        debounce_ms: u64,
    ) -> Self {
        let quiet = debounce_ms.min(ENRICHMENT_DEBOUNCE_CEILING_MS);
        Self {
            conversions,
            debouncer: Debouncer::new(quiet, ENRICHMENT_DEBOUNCE_CEILING_MS),
            current,
            pending: None,
            batches: 0,
        }
    }

    /// Presentation the last completed batch applied
    pub fn current(&self) -> &PresentationConfig {
        &self.current
    }

    /// Presentation waiting for the next batch, if any
    pub fn pending(&self) -> Option<&PresentationConfig> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of batch passes run so far
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Queue a presentation change
    ///
    /// Invalid overrides are rejected up front and leave any queued change in
    /// place. A later request replaces an earlier one that has not run yet.
    pub fn request_change(
        &mut self,
        config: PresentationConfig,
        now: i64,
    ) -> Result<(), ConversionError> {
        self.conversions.validate_config(&config)?;
        debug!("Presentation change queued: region {}", config.region);
        self.pending = Some(config);
        self.debouncer.request(now);
        Ok(())
    }

    /// Run the batch if its debounce window has elapsed
    pub fn poll<T: EnrichmentTarget + ?Sized>(
        &mut self,
        now: i64,
        target: &mut T,
    ) -> Option<ReEnrichmentReport> {
        if !self.debouncer.take_if_due(now) {
            return None;
        }
        self.run(target)
    }

    /// Run any queued batch immediately
    pub fn flush<T: EnrichmentTarget + ?Sized>(&mut self, target: &mut T) -> Option<ReEnrichmentReport> {
        if !self.debouncer.flush() {
            return None;
        }
        self.run(target)
    }

    fn run<T: EnrichmentTarget + ?Sized>(&mut self, target: &mut T) -> Option<ReEnrichmentReport> {
        let presentation = self.pending.take()?;
        let instances = target.re_enrich_all(&presentation);
        self.batches += 1;
        info!(
            "Re-enriched {} sensor instances for region {}",
            instances, presentation.region
        );
        self.current = presentation.clone();
        Some(ReEnrichmentReport {
            instances,
            presentation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::{DataCategory, UnitRegion};

    #[derive(Default)]
    struct Recorder {
        passes: Vec<PresentationConfig>,
    }

    impl EnrichmentTarget for Recorder {
        fn re_enrich_all(&mut self, presentation: &PresentationConfig) -> usize {
            self.passes.push(presentation.clone());
            3
        }
    }

    fn coordinator() -> ReEnrichmentCoordinator {
        let conversions = Arc::new(ConversionRegistry::new().unwrap());
        ReEnrichmentCoordinator::new(conversions, PresentationConfig::default(), 50)
    }

    #[test]
    fn test_burst_coalesces_into_one_pass() {
        let mut coordinator = coordinator();
        let mut target = Recorder::default();
        coordinator
            .request_change(PresentationConfig::for_region(UnitRegion::Metric), 0)
            .unwrap();
        coordinator
            .request_change(PresentationConfig::for_region(UnitRegion::Imperial), 20)
            .unwrap();
        assert!(coordinator.poll(40, &mut target).is_none());

        let report = coordinator.poll(70, &mut target).unwrap();
        assert_eq!(report.instances, 3);
        assert_eq!(target.passes.len(), 1);
        assert_eq!(target.passes[0].region, UnitRegion::Imperial);
        assert_eq!(coordinator.current().region, UnitRegion::Imperial);
        assert!(coordinator.poll(500, &mut target).is_none());
    }

    #[test]
    fn test_deadline_under_sustained_changes() {
        let mut coordinator = coordinator();
        let mut target = Recorder::default();
        let mut ran_at = None;
        for now in (0..300).step_by(10) {
            coordinator
                .request_change(PresentationConfig::for_region(UnitRegion::Metric), now)
                .unwrap();
            if coordinator.poll(now, &mut target).is_some() {
                ran_at = Some(now);
                break;
            }
        }
        assert_eq!(ran_at, Some(100));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut coordinator = coordinator();
        let config = PresentationConfig::default().with_override(DataCategory::Depth, "speed.kn");
        assert!(coordinator.request_change(config, 0).is_err());
        assert!(!coordinator.is_pending());
    }

    #[test]
    fn test_flush_runs_immediately() {
        let mut coordinator = coordinator();
        let mut target = Recorder::default();
        assert!(coordinator.flush(&mut target).is_none());
        coordinator
            .request_change(PresentationConfig::for_region(UnitRegion::NauticalUs), 0)
            .unwrap();
        assert!(coordinator.flush(&mut target).is_some());
        assert_eq!(coordinator.batches(), 1);
    }
}
