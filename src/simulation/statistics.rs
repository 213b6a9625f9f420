//! Statistics collection and reporting
//!
//! Counters and samples gathered while the run progresses, and the final
//! aggregation of the engine state into a `SimulationReport`.

use std::collections::BTreeMap;

use crate::model::{BufferState, Part, StationState, TimeBuckets};
use crate::simulation::calendar::Calendar;
use crate::simulation::engine::ReleasedOrder;
use crate::simulation::layout::Layout;
use crate::simulation::replay::ReplayEvent;
use crate::simulation::report::{
    BottleneckEntry, BufferStats, ComponentStatus, OrderReport, ProductReport, ResourceStats,
    SimulationReport, Spread, StationStats, WipSample,
};
use crate::simulation::resource_pool::ResourcePool;
use crate::types::{OrderId, OrderStatus, PartKind, PartState, ProductCatalog, RunSettings};

const DUE_DATE_TOLERANCE: f64 = 1e-9;

/// Counters and samples collected during a run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Parts finished
    pub produced: usize,
    /// Parts scrapped
    pub scrapped: usize,
    /// Work-in-process series
    pub wip_history: Vec<WipSample>,
    bottleneck_hours: BTreeMap<usize, f64>,
    next_sample: f64,
}

/// Borrowed engine state at the end of a run
#[derive(Debug, Clone, Copy)]
pub struct RunSnapshot<'a> {
    /// Final clock
    pub now: f64,
    /// Events dispatched
    pub steps: u64,
    /// Shift calendar
    pub calendar: &'a Calendar,
    /// Line layout
    pub layout: &'a Layout,
    /// Run settings
    pub settings: &'a RunSettings,
    /// Product catalog
    pub catalog: &'a ProductCatalog,
    /// Part arena
    pub parts: &'a [Part],
    /// Station occupancy
    pub stations: &'a [StationState],
    /// Buffer occupancy
    pub buffers: &'a [BufferState],
    /// Resource pools
    pub pools: &'a [ResourcePool],
    /// Orders released into the run
    pub orders: &'a [ReleasedOrder],
}

impl RunStatistics {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished part
    pub fn record_finished(&mut self) {
        self.produced += 1;
    }

    /// Count a scrapped part
    pub fn record_scrapped(&mut self) {
        self.scrapped += 1;
    }

    /// Whether the clock passed the next sampling instant
    pub fn sample_due(&self, now: f64) -> bool {
        now >= self.next_sample
    }

    /// Store a WIP sample and credit the most loaded station with one interval
    pub fn record_sample(&mut self, sample: WipSample, bottleneck: Option<usize>, interval: f64) {
        if let Some(station) = bottleneck {
            *self.bottleneck_hours.entry(station).or_insert(0.0) += interval;
        }
        self.next_sample = ((sample.time / interval).floor() + 1.0) * interval;
        self.wip_history.push(sample);
    }

    /// Aggregate the final state into a report
    pub fn aggregate(&self, run: &RunSnapshot<'_>, replay_events: Vec<ReplayEvent>) -> SimulationReport {
        let duration = run.now;
        let working_hours_total = run.calendar.paid_hours(duration);

        let finished: Vec<&Part> =
            run.parts.iter().filter(|p| p.state() == PartState::Finished).collect();
        let count = finished.len();

        let mut avg_lead_time = 0.0;
        let mut avg_flow_efficiency = 0.0;
        let mut lead_time_breakdown = TimeBuckets::default();
        if count > 0 {
            let n = count as f64;
            let total_lead: f64 = finished.iter().map(|p| p.buckets().total()).sum();
            let total_processing: f64 = finished.iter().map(|p| p.buckets().processing).sum();
            avg_lead_time = total_lead / n;
            if total_lead > 0.0 {
                avg_flow_efficiency = total_processing / total_lead * 100.0;
            }
            lead_time_breakdown = TimeBuckets {
                processing: total_processing / n,
                transport: finished.iter().map(|p| p.buckets().transport).sum::<f64>() / n,
                wait: finished.iter().map(|p| p.buckets().wait).sum::<f64>() / n,
                blocked: finished.iter().map(|p| p.buckets().blocked).sum::<f64>() / n,
            };
        }

        // Mounted children left the line inside their parent
        let total_material_cost: f64 = run
            .parts
            .iter()
            .filter(|p| {
                matches!(p.state(), PartState::Finished | PartState::Scrapped | PartState::Assembled)
            })
            .map(|p| p.material_cost)
            .sum();

        let resource_stats: Vec<ResourceStats> = run
            .pools
            .iter()
            .map(|pool| {
                let paid = working_hours_total * pool.capacity as f64;
                let hours_worked = pool.busy_hours();
                ResourceStats {
                    id: pool.id.clone(),
                    name: pool.name.clone(),
                    kind: pool.kind,
                    capacity: pool.capacity,
                    utilization: percentage(hours_worked, paid),
                    hours_worked,
                    attendance_cost: paid * pool.cost_per_hour,
                }
            })
            .collect();
        let total_labor_cost: f64 = resource_stats.iter().map(|r| r.attendance_cost).sum();

        let mut total_energy_cost = 0.0;
        let station_stats: Vec<StationStats> = run
            .layout
            .stations
            .iter()
            .zip(run.stations)
            .map(|(config, state)| {
                let capacity_time = working_hours_total * config.capacity.max(1) as f64;
                total_energy_cost += state.busy_time * run.settings.energy_cost_per_hour;

                let utilization = percentage(state.busy_time, capacity_time);
                let starvation = percentage(state.starved_time, capacity_time);
                let breakdown_pct = percentage(state.downtime(), capacity_time);
                StationStats {
                    id: config.id.clone(),
                    name: config.display_name().to_string(),
                    utilization,
                    starvation,
                    blocked: (100.0 - utilization - starvation - breakdown_pct).max(0.0),
                    breakdown_pct,
                    failures: state.breakdowns.len(),
                    max_queue: state.max_queue,
                }
            })
            .collect();

        let buffer_stats = run
            .layout
            .buffers
            .iter()
            .zip(run.buffers)
            .map(|(config, state)| BufferStats {
                id: config.id.clone(),
                name: if config.name.is_empty() { config.id.to_string() } else { config.name.clone() },
                max_queue: state.max_queue,
                utilization: percentage(state.max_queue as f64, config.capacity as f64),
            })
            .collect();

        let order_reports = order_reports(run);
        let due_dated: Vec<&OrderReport> =
            order_reports.iter().filter(|o| o.status != OrderStatus::NoDueDate).collect();
        let otif = if due_dated.is_empty() {
            100.0
        } else {
            due_dated.iter().filter(|o| o.on_time).count() as f64 / due_dated.len() as f64 * 100.0
        };

        let mut dynamic_bottlenecks: Vec<BottleneckEntry> = self
            .bottleneck_hours
            .iter()
            .map(|(&station, &hours)| {
                let config = &run.layout.stations[station];
                BottleneckEntry {
                    station: config.id.clone(),
                    name: config.display_name().to_string(),
                    hours,
                }
            })
            .collect();
        dynamic_bottlenecks.sort_by(|a, b| b.hours.total_cmp(&a.hours));

        let cost_per_unit = if count > 0 {
            (total_labor_cost + total_energy_cost + total_material_cost) / count as f64
        } else {
            0.0
        };

        SimulationReport {
            duration,
            working_hours_total,
            produced: self.produced,
            scrapped: self.scrapped,
            avg_lead_time,
            avg_flow_efficiency,
            lead_time_breakdown,
            actual_takt: if self.produced > 0 {
                working_hours_total / self.produced as f64
            } else {
                0.0
            },
            target_takt: run.settings.target_takt_minutes / 60.0,
            otif,
            cost_per_unit,
            total_labor_cost,
            total_energy_cost,
            total_material_cost,
            steps: run.steps,
            station_stats,
            buffer_stats,
            resource_stats,
            dynamic_bottlenecks,
            order_reports,
            product_reports: product_reports(run),
            wip_history: self.wip_history.clone(),
            replay_events,
            error: None,
        }
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn order_reports(run: &RunSnapshot<'_>) -> Vec<OrderReport> {
    let mut by_order: BTreeMap<&OrderId, Vec<&Part>> = BTreeMap::new();
    for part in run.parts {
        by_order.entry(&part.order_id).or_default().push(part);
    }

    run.orders
        .iter()
        .filter_map(|order| {
            let parts = by_order.get(&order.id)?;
            let start_time = parts.iter().map(|p| p.created_at).fold(f64::INFINITY, f64::min);
            let open = parts.iter().any(|p| !p.state().is_terminal());
            let end_time = if open {
                run.now
            } else {
                parts.iter().filter_map(|p| p.finished_at).fold(start_time, f64::max)
            };

            let finished_parts = parts.iter().filter(|p| p.state() == PartState::Finished).count();
            let scraps = parts.iter().filter(|p| p.state() == PartState::Scrapped).count();
            let on_time = !open
                && order.due_date.map_or(true, |due| end_time <= due + DUE_DATE_TOLERANCE);
            let status = match order.due_date {
                None => OrderStatus::NoDueDate,
                Some(_) if !on_time => OrderStatus::Late,
                Some(_) if scraps > 0 => OrderStatus::Scrapped,
                Some(_) => OrderStatus::Ok,
            };

            let mut components = ComponentStatus::default();
            for part in parts {
                let sub_code = part.sub_code().to_string();
                match part.state() {
                    PartState::Processing | PartState::InTransport => {
                        components.processing.push(sub_code)
                    }
                    PartState::IdleInBuffer | PartState::Assembled | PartState::Finished => {
                        components.ready.push(sub_code)
                    }
                    _ => components.todo.push(sub_code),
                }
            }

            Some(OrderReport {
                id: order.id.clone(),
                code: order.sections.clone(),
                size: order.size.clone(),
                due_date: order.due_date,
                start_time,
                end_time,
                duration: end_time - start_time,
                progress: format!("{}/{}", finished_parts, parts.len()),
                finished_parts,
                total_parts: parts.len(),
                scraps,
                on_time,
                status,
                components,
            })
        })
        .collect()
}

fn product_reports(run: &RunSnapshot<'_>) -> Vec<ProductReport> {
    #[derive(Default)]
    struct Samples {
        count: usize,
        scraps: usize,
        processing: Vec<f64>,
        wait: Vec<f64>,
        other: Vec<f64>,
    }

    let mut products: BTreeMap<(&'static str, &str, &str), (PartKind, Samples)> = BTreeMap::new();
    for part in run.parts {
        if !matches!(part.state(), PartState::Finished | PartState::Assembled | PartState::Scrapped) {
            continue;
        }
        let key = (part.kind.family(), part.size.as_str(), part.code.as_str());
        let (_, samples) = products.entry(key).or_insert_with(|| (part.kind, Samples::default()));
        samples.count += 1;
        if part.state() == PartState::Scrapped {
            samples.scraps += 1;
        }
        let buckets = part.buckets();
        samples.processing.push(buckets.processing);
        samples.wait.push(buckets.wait);
        samples.other.push(buckets.transport + buckets.blocked);
    }

    products
        .into_iter()
        .map(|((_, size, code), (kind, samples))| ProductReport {
            kind,
            size: size.to_string(),
            code: code.to_string(),
            count: samples.count,
            scraps: samples.scraps,
            scrap_rate: percentage(samples.scraps as f64, samples.count as f64),
            standard_time: run.catalog.standard_time(kind, size, code),
            processing: Spread::of(&samples.processing),
            wait: Spread::of(&samples.wait),
            other: Spread::of(&samples.other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_realigns_to_interval() {
        let mut stats = RunStatistics::new();
        assert!(stats.sample_due(0.0));

        stats.record_sample(WipSample { time: 0.0, count: 1, value: 100.0 }, Some(2), 1.0);
        assert!(!stats.sample_due(0.5));
        assert!(stats.sample_due(1.0));

        // A long gap produces a single sample, then the next boundary
        stats.record_sample(WipSample { time: 7.4, count: 0, value: 0.0 }, None, 1.0);
        assert!(!stats.sample_due(7.9));
        assert!(stats.sample_due(8.0));
        assert_eq!(stats.wip_history.len(), 2);
        assert_eq!(stats.bottleneck_hours.get(&2), Some(&1.0));
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }
}
