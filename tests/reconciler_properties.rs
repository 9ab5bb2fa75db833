//! Ordering and deduplication properties of the incident reconciler
//! under random sequences of snapshot, bootstrap, poll and live deliveries

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use incident_feed::{Incident, IncidentReconciler, IncidentView};

const DWELL: Duration = Duration::from_millis(5000);
const ID_POOL: u32 = 24;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn incident(id: &str, offset_secs: i64) -> Incident {
    Incident::new(id, "intrusion", 0.75, "cam-7", t0() + ChronoDuration::seconds(offset_secs))
}

/// Expected contents: id -> (timestamp of first delivery, arrival index)
#[derive(Default)]
struct Model {
    first_seen: HashMap<String, (DateTime<Utc>, usize)>,
    next_arrival: usize,
}

impl Model {
    fn deliver(&mut self, incident: &Incident) {
        if !self.first_seen.contains_key(&incident.id) {
            self.first_seen
                .insert(incident.id.clone(), (incident.timestamp, self.next_arrival));
            self.next_arrival += 1;
        }
    }
}

fn random_incident(rng: &mut StdRng) -> Incident {
    let id = rng.gen_range(0..ID_POOL).to_string();
    // Narrow range so equal timestamps are common
    incident(&id, rng.gen_range(-5..5))
}

fn random_batch(rng: &mut StdRng) -> Vec<Incident> {
    let len = rng.gen_range(0..8);
    (0..len).map(|_| random_incident(rng)).collect()
}

fn check_invariants(view: &IncidentView, model: &Model) {
    let ids: HashSet<&str> = view.incidents.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids.len(), view.len(), "duplicate id in {:?}", view.ids());
    assert_eq!(view.len(), model.first_seen.len());

    for pair in view.incidents.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.timestamp >= b.timestamp, "order broken: {:?}", view.ids());
        if a.timestamp == b.timestamp {
            let arrival_a = model.first_seen[&a.id].1;
            let arrival_b = model.first_seen[&b.id].1;
            assert!(arrival_a < arrival_b, "tie not in arrival order: {:?}", view.ids());
        }
    }

    for incident in &view.incidents {
        assert_eq!(model.first_seen[&incident.id].0, incident.timestamp);
    }

    for id in &view.highlighted {
        assert!(ids.contains(id.as_str()), "highlight {} not in collection", id);
    }
}

#[tokio::test(start_paused = true)]
async fn test_random_sequences_keep_order_and_uniqueness() {
    for seed in 0..64u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut reconciler, _expired) = IncidentReconciler::new(DWELL);
        let mut model = Model::default();

        for step in 0..60 {
            match rng.gen_range(0..4) {
                0 => {
                    let batch = random_batch(&mut rng);
                    // Only the first snapshot counts
                    if !reconciler.snapshot_applied() {
                        batch.iter().for_each(|i| model.deliver(i));
                    }
                    reconciler.apply_snapshot(batch);
                }
                1 => {
                    let batch = random_batch(&mut rng);
                    batch.iter().for_each(|i| model.deliver(i));
                    reconciler.apply_bootstrap(batch);
                }
                2 => {
                    let batch = random_batch(&mut rng);
                    batch.iter().for_each(|i| model.deliver(i));
                    reconciler.apply_poll(batch);
                }
                _ => {
                    let live = random_incident(&mut rng);
                    model.deliver(&live);
                    reconciler.apply_incident(live);
                }
            }

            let view = reconciler.current_state();
            check_invariants(&view, &model);
            assert!(
                view.highlighted.len() <= view.len(),
                "seed {} step {}",
                seed,
                step
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_replayed_incidents_are_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut reconciler, _expired) = IncidentReconciler::new(DWELL);

    let deliveries: Vec<Incident> = (0..40).map(|_| random_incident(&mut rng)).collect();
    for incident in &deliveries {
        reconciler.apply_incident(incident.clone());
    }
    let once = reconciler.current_state();

    for incident in deliveries.iter().rev() {
        assert!(!reconciler.apply_incident(incident.clone()));
    }
    let twice = reconciler.current_state();

    assert_eq!(once.ids(), twice.ids());
    assert_eq!(once.highlighted, twice.highlighted);
    assert_eq!(twice.highlighted.len(), twice.len());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_then_incident_is_prepended_and_highlighted() {
    let (mut reconciler, _expired) = IncidentReconciler::new(DWELL);
    reconciler.apply_snapshot(vec![incident("1", 0), incident("2", -10)]);
    reconciler.apply_incident(incident("3", 5));

    let view = reconciler.current_state();
    assert_eq!(view.ids(), vec!["3", "1", "2"]);
    assert_eq!(view.highlighted, HashSet::from(["3".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn test_second_bootstrap_does_not_duplicate() {
    let (mut reconciler, _expired) = IncidentReconciler::new(DWELL);
    reconciler.apply_bootstrap(vec![incident("1", 0)]);
    reconciler.apply_bootstrap(vec![incident("1", 0), incident("2", 60)]);

    assert_eq!(reconciler.current_state().ids(), vec!["2", "1"]);
}

#[tokio::test(start_paused = true)]
async fn test_existing_id_keeps_length_and_single_highlight() {
    let (mut reconciler, _expired) = IncidentReconciler::new(DWELL);
    reconciler.apply_snapshot(vec![incident("1", 0)]);
    reconciler.apply_incident(incident("2", 1));

    reconciler.apply_incident(incident("1", 0));
    reconciler.apply_incident(incident("2", 1));

    let view = reconciler.current_state();
    assert_eq!(view.len(), 2);
    assert_eq!(view.highlighted, HashSet::from(["2".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn test_highlight_present_then_absent_after_dwell() {
    let (mut reconciler, mut expired) = IncidentReconciler::new(DWELL);
    reconciler.apply_incident(incident("1", 0));
    assert!(reconciler.current_state().is_new("1"));

    tokio::time::advance(DWELL - Duration::from_millis(1)).await;
    assert!(expired.try_recv().is_err());
    assert!(reconciler.current_state().is_new("1"));

    let fired = expired.recv().await.unwrap();
    reconciler.expire(&fired);
    assert!(!reconciler.current_state().is_new("1"));
}
