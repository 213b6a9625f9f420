//! Event handlers
//!
//! One transition per event kind, plus the admission attempts they share:
//! pushing a buffer head towards its next station, matching an assembly,
//! starting an operation and moving a part along a flow.

use tracing::{debug, trace};

use super::{EventKind, PendingTransport, SimulationState, REQUIRED_TOOLS};
use crate::model::{
    parse_sections, product_type_id, Breakdown, ChildSpec, NodeRef, Operation, Part, RoutingKey,
    ASSEMBLY_PHASE, FABRICATION_PHASE,
};
use crate::simulation::error::{RecoveryStrategy, SimulationError, SimulationResult};
use crate::simulation::layout::WorkerBinding;
use crate::simulation::replay::{BufferItem, ReplayEvent, StationSpan, MAX_BUFFER_SNAPSHOT_ITEMS};
use crate::simulation::resource_pool::{RequestOutcome, WaitingRequest};
use crate::types::{
    defaults, NodeId, OrderId, PartId, PartKind, PartState, StationKind, StationStatus, UsageKind,
};

/// What an operation needs before it can start
#[derive(Debug, Clone, Copy)]
struct Requirement {
    duration: f64,
    operators: u32,
}

impl SimulationState<'_> {
    pub(super) fn dispatch(&mut self, event: EventKind) -> SimulationResult<()> {
        trace!(now = self.now, kind = event.label(), "Dispatch");
        match event {
            EventKind::OrderArrival { order } => self.on_order_arrival(order),
            EventKind::PartArrivesAtNode { part, node } => self.on_part_arrival(part, node),
            EventKind::WorkerArrivesAtStation { part, station, pool, operators, base_duration } => {
                self.begin_processing(part, station, Some(pool), operators, base_duration)
            }
            EventKind::OperationComplete {
                part,
                station,
                pool,
                operators,
                duration,
                repair,
                started_at,
            } => self.on_operation_complete(part, station, pool, operators, duration, repair, started_at),
            EventKind::TransportComplete { part, flow, pool, tools, started_at } => {
                self.on_transport_complete(part, flow, pool, tools, started_at)
            }
            EventKind::ShiftResume => self.on_shift_resume(),
        }
    }

    // ---- orders -------------------------------------------------------

    fn on_order_arrival(&mut self, index: usize) -> SimulationResult<()> {
        let order = &self.orders[index];
        let (id, due_date) = (order.id.clone(), order.due_date);

        let bom = match parse_sections(&order.sections, &order.size) {
            Ok(bom) => bom,
            Err(e) => {
                let err = SimulationError::malformed_order(id.to_string(), e.to_string());
                return match self.error_handler.handle_error(&err, "order arrival") {
                    RecoveryStrategy::Skip => {
                        self.log.warn(format!("Order {} skipped: {}", id, e));
                        Ok(())
                    }
                    RecoveryStrategy::Abort => Err(err),
                };
            }
        };

        let mut stagger = 0.0;
        let mut created = 0;
        for section in bom {
            let parent = ChildSpec { code: section.code.clone(), size: section.size.clone() };
            if self.create_part(&id, PartKind::Parent, &parent, section.section, section.children.clone(), due_date, stagger)? {
                created += 1;
            }
            for child in &section.children {
                if self.create_part(&id, PartKind::Child, child, section.section, Vec::new(), due_date, stagger)? {
                    created += 1;
                }
            }
            stagger += defaults::SECTION_STAGGER_HOURS;
        }

        self.log.info(format!("Order {} released at t={:.2} h: {} part(s)", id, self.now, created));
        Ok(())
    }

    /// Create a part and send it to its entry buffer; false when it has none
    #[allow(clippy::too_many_arguments)]
    fn create_part(
        &mut self,
        order: &OrderId,
        kind: PartKind,
        spec: &ChildSpec,
        section: u32,
        bom: Vec<ChildSpec>,
        due_date: Option<f64>,
        offset: f64,
    ) -> SimulationResult<bool> {
        let product_type = product_type_id(kind, &spec.size, &spec.code);
        let Some(entry) = self.layout.entry_buffer(&product_type) else {
            self.log.warn(format!(
                "Order {}: no entry buffer admits {}; part not created",
                order, product_type
            ));
            return Ok(false);
        };

        let key = RoutingKey::new(kind, spec.size.clone(), spec.code.clone(), FABRICATION_PHASE);
        let routing = self.layout.routings.operations_or_empty(&key);
        let id = PartId(self.parts.len());
        let created_at = self.now + offset;
        let material_cost = self.input.catalog.material_cost(kind, &spec.size, &spec.code);

        self.parts.push(Part::new(
            id,
            order.clone(),
            kind,
            spec.code.clone(),
            spec.size.clone(),
            section,
            routing,
            bom,
            created_at,
            due_date,
            material_cost,
        ));
        debug!(part = %id, %product_type, "Part created");
        self.schedule(created_at, EventKind::PartArrivesAtNode { part: id, node: NodeRef::Buffer(entry) })?;
        Ok(true)
    }

    // ---- arrivals -----------------------------------------------------

    fn on_part_arrival(&mut self, part: PartId, node: NodeRef) -> SimulationResult<()> {
        self.parts[part.index()].location = Some(node);
        match node {
            NodeRef::Buffer(buffer) => {
                self.set_state(part, PartState::IdleInBuffer);
                self.buffers[buffer].enqueue(part);
                self.record_buffer(buffer);

                if self.layout.buffers[buffer].is_exit {
                    self.finish_part(part);
                    return Ok(());
                }

                self.try_push_from_buffer(buffer)?;
                if let Some(station) = self.layout.assembly_fed_by(buffer) {
                    self.try_start_assembly(station)?;
                }
                Ok(())
            }
            NodeRef::Station(station) => {
                let state = &mut self.stations[station];
                state.incoming = state.incoming.saturating_sub(1);
                state.enqueue(part);
                self.set_state(part, PartState::IdleAtStation);
                self.try_start_station(station)
            }
        }
    }

    fn on_shift_resume(&mut self) -> SimulationResult<()> {
        self.resume_scheduled = false;
        debug!(now = self.now, "Shift resume");
        for buffer in 0..self.buffers.len() {
            if !self.layout.buffers[buffer].is_exit {
                self.try_push_from_buffer(buffer)?;
            }
        }
        for station in 0..self.stations.len() {
            self.try_start_station(station)?;
        }
        Ok(())
    }

    /// Schedule one wake-up at the next working instant
    fn request_shift_resume(&mut self) -> SimulationResult<()> {
        if self.resume_scheduled {
            return Ok(());
        }
        let resume = self.calendar.advance(self.now, 0.0)?;
        if resume > self.now {
            self.schedule(resume, EventKind::ShiftResume)?;
            self.resume_scheduled = true;
        }
        Ok(())
    }

    // ---- buffers ------------------------------------------------------

    /// Move buffer heads to their next station while the station admits them
    fn try_push_from_buffer(&mut self, buffer: usize) -> SimulationResult<()> {
        if !self.calendar.is_working_time(self.now) {
            return self.request_shift_resume();
        }

        while let Some(part) = self.buffers[buffer].queue.front() {
            let Some(operation) = self.parts[part.index()].next_operation() else { break };
            let Some(target) = self.layout.station_for_operation(operation) else { break };
            let Some(flow) =
                self.layout.flow_between(NodeRef::Buffer(buffer), NodeRef::Station(target))
            else {
                break;
            };

            let state = &self.stations[target];
            let limit = self.layout.stations[target].capacity.max(1) + defaults::ADMISSION_SLACK;
            if state.queue.len() as u32 + state.incoming >= limit {
                break;
            }

            self.buffers[buffer].queue.dequeue_front();
            self.record_buffer(buffer);
            self.initiate_transport(part, flow)?;
        }
        Ok(())
    }

    /// Retry the buffers feeding a station after it took a part
    fn notify_upstream(&mut self, station: usize) -> SimulationResult<()> {
        for index in 0..self.layout.inbound_buffers(station).len() {
            let buffer = self.layout.inbound_buffers(station)[index];
            self.try_push_from_buffer(buffer)?;
        }
        Ok(())
    }

    // ---- assembly -----------------------------------------------------

    fn try_start_station(&mut self, station: usize) -> SimulationResult<()> {
        if self.layout.stations[station].kind == StationKind::Assembly {
            self.try_start_assembly(station)
        } else {
            self.try_start_operation(station)
        }
    }

    /// Match a ready parent with all of its children, or do nothing
    fn try_start_assembly(&mut self, station: usize) -> SimulationResult<()> {
        if !self.calendar.is_working_time(self.now) {
            return self.request_shift_resume();
        }
        if !self.stations[station].has_idle_slot(self.capacity(station)) {
            return Ok(());
        }
        if !self.stations[station].queue.is_empty() {
            return self.try_start_operation(station);
        }

        let inbound = self.layout.inbound_buffers(station).to_vec();
        let Some((parent, parent_buffer)) = inbound.iter().find_map(|&buffer| {
            let head = self.buffers[buffer].queue.front()?;
            self.parts[head.index()].ready_for_assembly().then_some((head, buffer))
        }) else {
            return Ok(());
        };

        let Some(children) = self.match_children(parent, &inbound) else {
            trace!(%parent, "Assembly waits for children");
            return Ok(());
        };

        // Every match is confirmed; consume parent and children together
        self.buffers[parent_buffer].queue.remove(parent);
        self.record_buffer(parent_buffer);
        for &(child, buffer) in &children {
            self.buffers[buffer].queue.remove(child);
            self.record_buffer(buffer);
            self.set_state(child, PartState::Assembled);
            let part = &mut self.parts[child.index()];
            part.parent = Some(parent);
            part.location = Some(NodeRef::Station(station));
        }

        let child_ids: Vec<PartId> = children.iter().map(|&(child, _)| child).collect();
        let routing = self.assembly_routing(parent, &child_ids);
        let operations = routing.len();
        let p = &mut self.parts[parent.index()];
        p.complete_assembly(child_ids, routing);
        p.location = Some(NodeRef::Station(station));
        self.set_state(parent, PartState::IdleAtStation);
        self.stations[station].enqueue(parent);

        debug!(%parent, children = children.len(), operations, "Assembly matched");
        self.try_start_operation(station)
    }

    /// Locate a head-of-queue child for every child spec of the parent
    fn match_children(&self, parent: PartId, inbound: &[usize]) -> Option<Vec<(PartId, usize)>> {
        let mut matched: Vec<(PartId, usize)> = Vec::new();
        for spec in &self.parts[parent.index()].bom {
            let product_type = product_type_id(PartKind::Child, &spec.size, &spec.code);
            let buffer = inbound
                .iter()
                .copied()
                .find(|&b| self.layout.buffers[b].admits(&product_type))?;

            // Identical children come from consecutive positions of the same buffer
            let depth = matched.iter().filter(|&&(_, b)| b == buffer).count();
            let candidate = self.buffers[buffer].queue.iter().nth(depth)?;
            let child = &self.parts[candidate.index()];
            let fits = child.kind == PartKind::Child
                && child.code == spec.code
                && child.size == spec.size
                && child.state() == PartState::IdleInBuffer
                && child.routing_exhausted();
            if !fits {
                return None;
            }
            matched.push((candidate, buffer));
        }
        Some(matched)
    }

    /// Concatenate assembly-phase routings in the configured sequence
    fn assembly_routing(&self, parent: PartId, children: &[PartId]) -> Vec<Operation> {
        let phase_ops = |part: &Part| {
            self.layout.routings.operations_or_empty(&RoutingKey::new(
                part.kind,
                part.size.clone(),
                part.code.clone(),
                ASSEMBLY_PHASE,
            ))
        };
        let parent_part = &self.parts[parent.index()];

        let mut routing = Vec::new();
        for code in &self.input.settings.assembly_sequence {
            if parent_part.code == *code {
                routing.extend(phase_ops(parent_part));
            }
            for child in children.iter().map(|c| &self.parts[c.index()]) {
                if child.code == *code {
                    routing.extend(phase_ops(child));
                }
            }
        }

        if routing.is_empty() {
            for child in children {
                routing.extend(phase_ops(&self.parts[child.index()]));
            }
            routing.extend(phase_ops(parent_part));
        }
        routing
    }

    // ---- operations ---------------------------------------------------

    /// Start work on queued parts while slots and operators allow
    fn try_start_operation(&mut self, station: usize) -> SimulationResult<()> {
        loop {
            if !self.calendar.is_working_time(self.now) {
                return self.request_shift_resume();
            }
            let capacity = self.capacity(station);
            if !self.stations[station].has_idle_slot(capacity) {
                return Ok(());
            }
            let Some(part) = self.stations[station].queue.front() else { return Ok(()) };

            let Some(requirement) = self.requirement(station, part) else {
                self.stations[station].queue.dequeue_front();
                self.pass_through(station, part)?;
                continue;
            };

            let Some(binding) = self.layout.worker_binding(station) else {
                self.stations[station].queue.dequeue_front();
                self.stations[station].busy_slots += 1;
                self.notify_upstream(station)?;
                self.begin_processing(part, station, None, 0, requirement.duration)?;
                continue;
            };

            if self.pools[binding.pool].is_waiting(part) {
                return Ok(());
            }

            match self.pools[binding.pool].request(part, requirement.operators) {
                RequestOutcome::Granted => {
                    self.stations[station].queue.dequeue_front();
                    self.stations[station].busy_slots += 1;
                    self.notify_upstream(station)?;
                    self.dispatch_workers(part, station, binding, requirement)?;
                }
                RequestOutcome::Queued => {
                    if self.parts[part.index()].state() != PartState::WaitingForWorker {
                        self.set_state(part, PartState::WaitingForWorker);
                        let mut span = self.station_span(station, StationStatus::WaitingForWorker);
                        span.part = Some(part);
                        self.replay.station(span);
                    }
                    return Ok(());
                }
                RequestOutcome::Rejected => {
                    self.stations[station].queue.dequeue_front();
                    self.set_state(part, PartState::Blocked);
                    self.log.warn(format!(
                        "{} needs {} operator(s) at {} but pool {} only has {}; part parked",
                        part,
                        requirement.operators,
                        self.layout.stations[station].display_name(),
                        self.pools[binding.pool].name,
                        self.pools[binding.pool].capacity
                    ));
                    self.notify_upstream(station)?;
                }
            }
        }
    }

    /// Duration and operators of the next operation; `None` when a routing
    /// station has nothing left to do for the part
    fn requirement(&self, station: usize, part: PartId) -> Option<Requirement> {
        let config = &self.layout.stations[station];
        let part = &self.parts[part.index()];
        match config.kind {
            StationKind::SubAssembly | StationKind::Assembly => {
                let operation = part.next_operation()?;
                let duration = if operation.duration_hours > 0.0 {
                    operation.duration_hours
                } else {
                    defaults::OPERATION_HOURS
                };
                Some(Requirement { duration, operators: operation.operators_required.max(1) })
            }
            StationKind::Quality | StationKind::Packing => {
                let rules = if config.kind == StationKind::Quality {
                    &self.input.settings.quality_rules
                } else {
                    &self.input.settings.packing_rules
                };
                let duration = match rules.get(&part.size) {
                    Some(rule) => rule.duration_for(
                        part.attached_children.iter().map(|c| self.parts[c.index()].code.as_str()),
                    ),
                    None => defaults::OPERATION_HOURS,
                };
                Some(Requirement { duration, operators: 1 })
            }
        }
    }

    fn dispatch_workers(
        &mut self,
        part: PartId,
        station: usize,
        binding: WorkerBinding,
        requirement: Requirement,
    ) -> SimulationResult<()> {
        self.set_state(part, PartState::WaitingForWorkerTravel);
        let pool = &self.pools[binding.pool];
        let travel = binding.distance / pool.speed / 3600.0;
        let arrival = self.calendar.advance(self.now, travel)?;

        self.replay.record(ReplayEvent::WorkerTravel {
            start_time: self.now,
            end_time: arrival,
            from: pool.id.clone(),
            to: self.layout.stations[station].id.clone(),
            count: requirement.operators,
        });
        let mut span = self.station_span(station, StationStatus::WaitingForWorker).until(arrival);
        span.part = Some(part);
        span.slot = Some(self.stations[station].busy_slots.saturating_sub(1));
        self.replay.station(span);

        self.schedule(
            arrival,
            EventKind::WorkerArrivesAtStation {
                part,
                station,
                pool: binding.pool,
                operators: requirement.operators,
                base_duration: requirement.duration,
            },
        )
    }

    /// Apply variance and breakdowns, then schedule completion in working time
    fn begin_processing(
        &mut self,
        part: PartId,
        station: usize,
        pool: Option<usize>,
        operators: u32,
        base_duration: f64,
    ) -> SimulationResult<()> {
        self.set_state(part, PartState::Processing);
        let config = &self.layout.stations[station];
        let mut duration = self.variance.vary(base_duration, config.variance_pct);

        let mut repair = 0.0;
        if let Some(hours) = self.variance.breakdown(config.failure_prob) {
            repair = hours;
            duration += hours;
            self.stations[station].breakdowns.push(Breakdown { start_time: self.now, duration: hours });
            let mut span = self.station_span(station, StationStatus::Stop).until(self.now + hours);
            span.part = Some(part);
            self.replay.station(span);
            self.log.warn(format!(
                "Breakdown at {} (t={:.2} h): {:.2} h repair",
                self.layout.stations[station].display_name(),
                self.now,
                hours
            ));
            crate::sim_event!(warn, "breakdown", station = self.layout.stations[station].id.as_str(), repair = hours);
        }

        let done = self.calendar.advance(self.now, duration)?;
        let p = &self.parts[part.index()];
        let mut span = self.station_span(station, StationStatus::Run).until(done);
        span.slot = Some(self.stations[station].busy_slots.saturating_sub(1));
        span.part = Some(part);
        span.part_code = Some(p.code.clone());
        span.order = Some(p.order_id.clone());
        span.is_assembled = p.is_assembled();
        if self.layout.stations[station].kind.uses_routing() {
            span.operation = Some((p.routing_cursor() + 1, p.routing.len()));
        }
        self.replay.station(span);

        self.schedule(
            done,
            EventKind::OperationComplete {
                part,
                station,
                pool,
                operators,
                duration,
                repair,
                started_at: self.now,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn on_operation_complete(
        &mut self,
        part: PartId,
        station: usize,
        pool: Option<usize>,
        operators: u32,
        duration: f64,
        repair: f64,
        started_at: f64,
    ) -> SimulationResult<()> {
        let state = &mut self.stations[station];
        state.busy_time += (duration - repair).max(0.0);
        state.busy_slots = state.busy_slots.saturating_sub(1);
        let idle = self.station_span(station, StationStatus::Idle);
        self.replay.station(idle);

        if let Some(pool) = pool {
            self.replay.record(ReplayEvent::ResourceUsage {
                pool: self.pools[pool].id.clone(),
                usage: UsageKind::Processing,
                part,
                count: operators,
                start_time: started_at,
                end_time: self.now,
                station: Some(self.layout.stations[station].id.clone()),
            });
            if let Some(grant) = self.pools[pool].release(operators, duration) {
                self.resume_grant(pool, grant)?;
            }
        }

        let kind = self.layout.stations[station].kind;
        if kind == StationKind::Quality {
            let probability = self.input.settings.base_scrap_rate
                + self.layout.stations[station].failure_prob / 1000.0;
            if self.variance.scrap(probability) {
                self.set_state(part, PartState::Scrapped);
                self.stats.record_scrapped();
                self.log.warn(format!(
                    "{} ({}) scrapped at {}",
                    part,
                    self.parts[part.index()].code,
                    self.layout.stations[station].display_name()
                ));
                self.try_start_station(station)?;
                return self.notify_upstream(station);
            }
        }

        if kind.uses_routing() {
            self.parts[part.index()].advance_routing();
        }

        let stays = self.parts[part.index()]
            .next_operation()
            .is_some_and(|next| self.layout.stations[station].can_perform(next));
        if stays {
            self.stations[station].queue.enqueue_front(part);
            self.set_state(part, PartState::IdleAtStation);
            return self.try_start_operation(station);
        }

        self.try_start_station(station)?;
        self.notify_upstream(station)?;
        self.leave_station(station, part)
    }

    /// Forward a part that has no work at this station
    fn pass_through(&mut self, station: usize, part: PartId) -> SimulationResult<()> {
        debug!(%part, station = %self.layout.stations[station].id, "Pass-through");
        self.notify_upstream(station)?;
        self.leave_station(station, part)
    }

    fn leave_station(&mut self, station: usize, part: PartId) -> SimulationResult<()> {
        match self.layout.outbound_flow(NodeRef::Station(station)) {
            Some(flow) => self.initiate_transport(part, flow),
            None => {
                self.finish_part(part);
                Ok(())
            }
        }
    }

    fn finish_part(&mut self, part: PartId) {
        self.set_state(part, PartState::Finished);
        self.stats.record_finished();
        let p = &self.parts[part.index()];
        debug!(%part, order = %p.order_id, lead_time = p.lead_time(), "Part finished");
    }

    // ---- transport ----------------------------------------------------

    fn initiate_transport(&mut self, part: PartId, flow: usize) -> SimulationResult<()> {
        let route = self.layout.flows[flow].clone();
        if let NodeRef::Station(target) = route.to {
            self.stations[target].incoming += 1;
        }

        let Some(pool) = route.tool_pool else {
            self.set_state(part, PartState::InTransport);
            let hours = route.distance / self.input.settings.transport_speed / 3600.0;
            let arrival = self.calendar.advance(self.now, hours)?;
            self.record_transport(part, flow, self.now, arrival);
            return self.schedule(arrival, EventKind::PartArrivesAtNode { part, node: route.to });
        };

        match self.pools[pool].request(part, REQUIRED_TOOLS) {
            RequestOutcome::Granted => self.start_tooled_transport(part, flow, pool, REQUIRED_TOOLS),
            RequestOutcome::Queued => {
                self.pending_transports.insert(part, PendingTransport { flow });
                match route.from {
                    NodeRef::Station(station) => {
                        self.set_state(part, PartState::Blocked);
                        let mut span = self.station_span(station, StationStatus::Blocked);
                        span.part = Some(part);
                        self.replay.station(span);
                    }
                    NodeRef::Buffer(_) => self.set_state(part, PartState::WaitingForTool),
                }
                Ok(())
            }
            RequestOutcome::Rejected => {
                if let NodeRef::Station(target) = route.to {
                    let state = &mut self.stations[target];
                    state.incoming = state.incoming.saturating_sub(1);
                }
                self.set_state(part, PartState::Blocked);
                self.log.warn(format!(
                    "{} cannot move: tool pool {} has no capacity; part parked",
                    part, self.pools[pool].name
                ));
                Ok(())
            }
        }
    }

    fn start_tooled_transport(
        &mut self,
        part: PartId,
        flow: usize,
        pool: usize,
        tools: u32,
    ) -> SimulationResult<()> {
        self.set_state(part, PartState::InTransport);
        let hours = self.layout.flows[flow].distance / self.pools[pool].speed / 3600.0;
        let arrival = self.calendar.advance(self.now, hours)?;
        self.schedule(
            arrival,
            EventKind::TransportComplete { part, flow, pool, tools, started_at: self.now },
        )
    }

    fn on_transport_complete(
        &mut self,
        part: PartId,
        flow: usize,
        pool: usize,
        tools: u32,
        started_at: f64,
    ) -> SimulationResult<()> {
        self.record_transport(part, flow, started_at, self.now);
        let target = self.layout.flows[flow].to;
        self.schedule(self.now, EventKind::PartArrivesAtNode { part, node: target })?;

        self.replay.record(ReplayEvent::ResourceUsage {
            pool: self.pools[pool].id.clone(),
            usage: UsageKind::Transport,
            part,
            count: tools,
            start_time: started_at,
            end_time: self.now,
            station: None,
        });
        let usage = self.calendar.working_hours_between(started_at, self.now);
        if let Some(grant) = self.pools[pool].release(tools, usage) {
            self.resume_grant(pool, grant)?;
        }
        Ok(())
    }

    // ---- resource hand-off ----------------------------------------------

    /// Resume the waiter a release granted, then keep serving waiters while
    /// free units cover them; a waiter that cannot use its units hands them back
    fn resume_grant(&mut self, pool: usize, mut grant: WaitingRequest) -> SimulationResult<()> {
        loop {
            let next = if self.try_resume(pool, grant)? {
                self.pools[pool].grant_next()
            } else {
                debug!(part = %grant.requester, pool = %self.pools[pool].id, "Grant handed back");
                self.pools[pool].release(grant.count, 0.0)
            };
            match next {
                Some(next) => grant = next,
                None => return Ok(()),
            }
        }
    }

    fn try_resume(&mut self, pool: usize, grant: WaitingRequest) -> SimulationResult<bool> {
        let part = grant.requester;

        if let Some(pending) = self.pending_transports.remove(&part) {
            self.start_tooled_transport(part, pending.flow, pool, grant.count)?;
            return Ok(true);
        }

        let p = &self.parts[part.index()];
        let Some(NodeRef::Station(station)) = p.location else { return Ok(false) };
        if p.state() != PartState::WaitingForWorker
            || !self.stations[station].has_idle_slot(self.capacity(station))
            || !self.stations[station].queue.contains(part)
        {
            return Ok(false);
        }
        let Some(binding) = self.layout.worker_binding(station).filter(|b| b.pool == pool) else {
            return Ok(false);
        };
        let Some(requirement) = self.requirement(station, part) else { return Ok(false) };

        self.stations[station].queue.remove(part);
        self.stations[station].busy_slots += 1;
        self.dispatch_workers(part, station, binding, Requirement { operators: grant.count, ..requirement })?;
        self.notify_upstream(station)?;
        Ok(true)
    }

    // ---- helpers --------------------------------------------------------

    fn capacity(&self, station: usize) -> u32 {
        self.layout.stations[station].capacity.max(1)
    }

    fn set_state(&mut self, part: PartId, next: PartState) {
        self.parts[part.index()].update_state(next, self.now, &self.calendar);
    }

    fn station_span(&self, station: usize, status: StationStatus) -> StationSpan {
        StationSpan::new(self.layout.stations[station].id.clone(), status, self.now)
    }

    fn record_buffer(&mut self, buffer: usize) {
        let queue = &self.buffers[buffer].queue;
        let content = queue
            .iter()
            .take(MAX_BUFFER_SNAPSHOT_ITEMS)
            .map(|id| {
                let part = &self.parts[id.index()];
                BufferItem { code: part.code.clone(), order: part.order_id.clone() }
            })
            .collect();
        self.replay.record(ReplayEvent::BufferState {
            time: self.now,
            buffer: self.layout.buffers[buffer].id.clone(),
            count: queue.len(),
            content,
        });
    }

    fn record_transport(&mut self, part: PartId, flow: usize, start_time: f64, end_time: f64) {
        let route = &self.layout.flows[flow];
        let p = &self.parts[part.index()];
        self.replay.record(ReplayEvent::Transport {
            start_time,
            end_time,
            from: NodeId::new(self.layout.node_id(route.from)),
            to: NodeId::new(self.layout.node_id(route.to)),
            part,
            part_code: p.code.clone(),
            order: p.order_id.clone(),
        });
    }
}
