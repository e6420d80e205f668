//! Order lifecycle: order → sample collection → result → validation → delivery.
//!
//! Every operation runs as one unit of work against the database. Events are
//! dispatched to the [`Notifier`] only after the unit of work commits, and a
//! failing notifier never fails the operation.

mod codes;

pub use codes::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::LabConfig;
use crate::db::Database;
use crate::error::{LabError, LabResult, TransitionError};
use crate::models::{
    new_id, ExamResult, NewOrder, NewResult, NewSample, Order, OrderState, Priority,
    SampleCollection, SampleState,
};
use crate::notify::{dispatch, EventKind, LabEvent, Notifier};

/// An order with its sample collection and results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub sample: Option<SampleCollection>,
    pub results: Vec<ExamResult>,
}

/// Owns the order state machine and its dependent sample and result records.
pub struct OrderLifecycle<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    notifier: &'a dyn Notifier,
    config: &'a LabConfig,
}

impl<'a> OrderLifecycle<'a> {
    pub fn new(
        db: &'a Database,
        clock: &'a dyn Clock,
        notifier: &'a dyn Notifier,
        config: &'a LabConfig,
    ) -> Self {
        Self {
            db,
            clock,
            notifier,
            config,
        }
    }

    /// Create an order in PENDIENTE. Priority defaults to NORMAL and the
    /// order date to today.
    pub fn create_order(&self, input: NewOrder) -> LabResult<Order> {
        if input.pet_id.trim().is_empty() {
            return Err(LabError::validation("pet is required"));
        }
        if input.vet_id.trim().is_empty() {
            return Err(LabError::validation("veterinarian is required"));
        }
        if input.exam_type.trim().is_empty() {
            return Err(LabError::validation("exam type is required"));
        }

        let now = self.clock.now();
        let order = Order {
            id: new_id(),
            pet_id: input.pet_id,
            vet_id: input.vet_id,
            exam_type: input.exam_type.trim().to_string(),
            priority: input.priority.unwrap_or_default(),
            state: OrderState::Pending,
            ordered_on: input.ordered_on.unwrap_or_else(|| self.clock.today()),
            observations: input.observations,
            presumptive_diagnosis: input.presumptive_diagnosis,
            symptoms: input.symptoms,
            created_at: now,
        };

        self.db.atomically(|db| -> LabResult<()> {
            if db.get_pet(&order.pet_id)?.is_none() {
                return Err(LabError::not_found("pet", &order.pet_id));
            }
            if db.get_veterinarian(&order.vet_id)?.is_none() {
                return Err(LabError::not_found("veterinarian", &order.vet_id));
            }
            db.insert_order(&order)?;
            Ok(())
        })?;

        info!(order_id = %order.id, exam_type = %order.exam_type, priority = %order.priority, "order created");
        self.emit(LabEvent::new(
            EventKind::OrderCreated,
            &order.id,
            format!("Order for {} created", order.exam_type),
        ));
        Ok(order)
    }

    /// Register the single sample collection of an order and move the order
    /// to EN_PROCESO.
    pub fn schedule_sample(&self, order_id: &str, input: NewSample) -> LabResult<SampleCollection> {
        if input.technician_id.trim().is_empty() {
            return Err(LabError::validation("technician is required"));
        }
        if input.sample_type.trim().is_empty() {
            return Err(LabError::validation("sample type is required"));
        }

        let now = self.clock.now();
        let sample = self.db.atomically(|db| -> LabResult<SampleCollection> {
            let order = db.require_order(order_id)?;
            if order.state.is_terminal() {
                return Err(closed(&order).into());
            }
            if db.get_sample_for_order(order_id)?.is_some() {
                return Err(LabError::Conflict(format!(
                    "order {} already has a sample collection",
                    order_id
                )));
            }
            if db.get_technician(&input.technician_id)?.is_none() {
                return Err(LabError::not_found("technician", &input.technician_id));
            }

            let mut sample_code = generate_sample_code(&self.config.sample_code_prefix, now);
            while db.sample_code_exists(&sample_code)? {
                sample_code = generate_sample_code(&self.config.sample_code_prefix, now);
            }

            let sample = SampleCollection {
                id: new_id(),
                order_id: order.id.clone(),
                technician_id: input.technician_id,
                sample_code,
                sample_type: input.sample_type.trim().to_string(),
                collection_method: input.collection_method,
                volume: input.volume,
                conditions: input.conditions,
                notes: input.notes,
                state: SampleState::Scheduled,
                scheduled_at: input.scheduled_at.unwrap_or(now),
                taken_at: None,
            };
            db.insert_sample(&sample)?;
            db.update_order_state(&order.id, OrderState::InProgress)?;
            Ok(sample)
        })?;

        info!(
            order_id = %order_id,
            sample_id = %sample.id,
            sample_code = %sample.sample_code,
            "sample scheduled, order in progress"
        );
        self.emit(
            LabEvent::new(
                EventKind::SampleScheduled,
                order_id,
                format!("Sample {} scheduled", sample.sample_code),
            )
            .with_subject(&sample.id),
        );
        Ok(sample)
    }

    /// Record that the specimen was obtained.
    pub fn mark_sample_taken(&self, sample_id: &str) -> LabResult<SampleCollection> {
        let now = self.clock.now();
        let sample = self.db.atomically(|db| -> LabResult<SampleCollection> {
            let mut sample = db
                .get_sample(sample_id)?
                .ok_or_else(|| LabError::not_found("sample", sample_id))?;
            sample.state = SampleState::Taken;
            sample.taken_at = Some(now);
            db.update_sample(&sample)?;
            Ok(sample)
        })?;

        info!(sample_id = %sample.id, order_id = %sample.order_id, "sample taken");
        self.emit(
            LabEvent::new(
                EventKind::SampleTaken,
                &sample.order_id,
                format!("Sample {} taken", sample.sample_code),
            )
            .with_subject(&sample.id),
        );
        Ok(sample)
    }

    pub fn change_sample_state(&self, sample_id: &str, state: SampleState) -> LabResult<SampleCollection> {
        let now = self.clock.now();
        let sample = self.db.atomically(|db| -> LabResult<SampleCollection> {
            let mut sample = db
                .get_sample(sample_id)?
                .ok_or_else(|| LabError::not_found("sample", sample_id))?;
            sample.state = state;
            if state != SampleState::Scheduled && sample.taken_at.is_none() {
                sample.taken_at = Some(now);
            }
            db.update_sample(&sample)?;
            Ok(sample)
        })?;

        info!(sample_id = %sample.id, state = %sample.state, "sample state changed");
        Ok(sample)
    }

    /// Record a result for an order. It always starts unvalidated and
    /// undelivered, whatever flags the caller sent.
    pub fn register_result(&self, order_id: &str, input: NewResult) -> LabResult<ExamResult> {
        if input.validated || input.delivered {
            debug!(order_id = %order_id, "ignoring caller-supplied validation flags");
        }

        let result = ExamResult {
            id: new_id(),
            order_id: order_id.to_string(),
            recorded_at: input.recorded_at.unwrap_or_else(|| self.clock.now()),
            description: input.description,
            values: input.values,
            reference_values: input.reference_values,
            conclusions: input.conclusions,
            recommendations: input.recommendations,
            method: input.method,
            technical_notes: input.technical_notes,
            validated: false,
            validated_at: None,
            delivered: false,
            delivered_at: None,
        };

        self.db.atomically(|db| -> LabResult<()> {
            db.require_order(order_id)?;
            db.insert_result(&result)?;
            Ok(())
        })?;

        info!(order_id = %order_id, result_id = %result.id, "result registered");
        self.emit(
            LabEvent::new(EventKind::ResultRegistered, order_id, "Result registered")
                .with_subject(&result.id),
        );
        Ok(result)
    }

    /// Sign off a result. The parent order becomes COMPLETADA even when
    /// sibling results are still unvalidated.
    pub fn validate_result(&self, result_id: &str) -> LabResult<ExamResult> {
        let now = self.clock.now();
        let result = self.db.atomically(|db| -> LabResult<ExamResult> {
            let mut result = db
                .get_result(result_id)?
                .ok_or_else(|| LabError::not_found("result", result_id))?;
            if result.validated {
                return Err(TransitionError::AlreadyValidated(result.id).into());
            }
            result.validated = true;
            result.validated_at = Some(now);
            db.update_result_flags(&result)?;
            db.update_order_state(&result.order_id, OrderState::Completed)?;
            Ok(result)
        })?;

        info!(result_id = %result.id, order_id = %result.order_id, "result validated, order completed");
        self.emit(
            LabEvent::new(
                EventKind::ResultValidated,
                &result.order_id,
                "Result validated; order completed",
            )
            .with_subject(&result.id),
        );
        Ok(result)
    }

    /// Hand a validated result to the owner.
    pub fn deliver_result(&self, result_id: &str) -> LabResult<ExamResult> {
        let now = self.clock.now();
        let result = self.db.atomically(|db| -> LabResult<ExamResult> {
            let mut result = db
                .get_result(result_id)?
                .ok_or_else(|| LabError::not_found("result", result_id))?;
            if !result.validated {
                return Err(TransitionError::NotValidated(result.id).into());
            }
            if result.delivered {
                return Err(TransitionError::AlreadyDelivered(result.id).into());
            }
            result.delivered = true;
            result.delivered_at = Some(now);
            db.update_result_flags(&result)?;
            Ok(result)
        })?;

        info!(result_id = %result.id, order_id = %result.order_id, "result delivered");
        self.emit(
            LabEvent::new(EventKind::ResultDelivered, &result.order_id, "Result delivered")
                .with_subject(&result.id),
        );
        Ok(result)
    }

    /// Remove a result that has not been validated yet.
    pub fn delete_result(&self, result_id: &str) -> LabResult<()> {
        self.db.atomically(|db| -> LabResult<()> {
            let result = db
                .get_result(result_id)?
                .ok_or_else(|| LabError::not_found("result", result_id))?;
            if result.validated {
                return Err(LabError::Conflict(format!(
                    "result {} is validated and cannot be deleted",
                    result_id
                )));
            }
            db.delete_result(result_id)?;
            Ok(())
        })?;
        info!(result_id = %result_id, "result deleted");
        Ok(())
    }

    /// Cancel an open order.
    pub fn cancel_order(&self, order_id: &str) -> LabResult<Order> {
        let (order, previous) = self.db.atomically(|db| -> LabResult<(Order, OrderState)> {
            let mut order = db.require_order(order_id)?;
            if order.state.is_terminal() {
                return Err(closed(&order).into());
            }
            let previous = order.state;
            order.state = OrderState::Cancelled;
            db.update_order_state(&order.id, order.state)?;
            Ok((order, previous))
        })?;

        info!(order_id = %order.id, from = %previous, "order cancelled");
        self.emit(LabEvent::new(
            EventKind::OrderStateChanged,
            &order.id,
            format!("{} -> {}", previous, order.state),
        ));
        Ok(order)
    }

    /// Operational override: set any state of the closed vocabulary, with no
    /// transition guard.
    pub fn change_state(&self, order_id: &str, new_state: &str) -> LabResult<Order> {
        let target: OrderState = new_state.parse()?;
        let (order, previous) = self.db.atomically(|db| -> LabResult<(Order, OrderState)> {
            let mut order = db.require_order(order_id)?;
            let previous = order.state;
            order.state = target;
            db.update_order_state(&order.id, order.state)?;
            Ok((order, previous))
        })?;

        if previous.is_terminal() && previous != target {
            warn!(order_id = %order.id, from = %previous, to = %target, "order moved out of a terminal state");
        }
        info!(order_id = %order.id, from = %previous, to = %target, "order state changed");
        self.emit(LabEvent::new(
            EventKind::OrderStateChanged,
            &order.id,
            format!("{} -> {}", previous, target),
        ));
        Ok(order)
    }

    /// Delete an order and its sample collection. Refused while results exist.
    pub fn delete_order(&self, order_id: &str) -> LabResult<()> {
        self.db.atomically(|db| -> LabResult<()> {
            db.require_order(order_id)?;
            let results = db.count_results_for_order(order_id)?;
            if results > 0 {
                return Err(LabError::Conflict(format!(
                    "order {} has {} result(s) and cannot be deleted",
                    order_id, results
                )));
            }
            db.delete_order(order_id)?;
            Ok(())
        })?;
        info!(order_id = %order_id, "order deleted");
        Ok(())
    }

    // =====================================================================
    // Queries
    // =====================================================================

    pub fn order_details(&self, order_id: &str) -> LabResult<OrderDetails> {
        let order = self.db.require_order(order_id)?;
        let sample = self.db.get_sample_for_order(order_id)?;
        let results = self.db.list_results_for_order(order_id)?;
        Ok(OrderDetails {
            order,
            sample,
            results,
        })
    }

    /// Order history of one pet, newest first.
    pub fn orders_for_pet(&self, pet_id: &str) -> LabResult<Vec<Order>> {
        if self.db.get_pet(pet_id)?.is_none() {
            return Err(LabError::not_found("pet", pet_id));
        }
        Ok(self.db.list_orders_for_pet(pet_id)?)
    }

    pub fn orders_by_state(&self, state: OrderState) -> LabResult<Vec<Order>> {
        Ok(self.db.list_orders_by_state(state)?)
    }

    /// Open URGENT orders, oldest first.
    pub fn urgent_open_orders(&self) -> LabResult<Vec<Order>> {
        Ok(self.db.list_open_orders_by_priority(Priority::Urgent)?)
    }

    pub fn results_pending_validation(&self) -> LabResult<Vec<ExamResult>> {
        Ok(self.db.list_unvalidated_results()?)
    }

    pub fn results_pending_delivery(&self) -> LabResult<Vec<ExamResult>> {
        Ok(self.db.list_undelivered_results()?)
    }

    pub fn latest_result(&self, order_id: &str) -> LabResult<Option<ExamResult>> {
        self.db.require_order(order_id)?;
        Ok(self.db.latest_result_for_order(order_id)?)
    }

    fn emit(&self, event: LabEvent) {
        dispatch(self.notifier, event);
    }
}

fn closed(order: &Order) -> TransitionError {
    TransitionError::OrderClosed {
        order_id: order.id.clone(),
        state: order.state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::test_support::{seed, Seed};
    use crate::notify::{NotifyError, RecordingNotifier};
    use chrono::{NaiveDate, TimeZone, Utc};

    struct Harness {
        db: Database,
        clock: FixedClock,
        notifier: RecordingNotifier,
        config: LabConfig,
        seed: Seed,
    }

    impl Harness {
        fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            let seed = seed(&db);
            Self {
                db,
                clock: FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
                notifier: RecordingNotifier::new(),
                config: LabConfig::default(),
                seed,
            }
        }

        fn lifecycle(&self) -> OrderLifecycle<'_> {
            OrderLifecycle::new(&self.db, &self.clock, &self.notifier, &self.config)
        }

        fn new_order(&self) -> NewOrder {
            NewOrder::new(&self.seed.pet_id, &self.seed.vet_id, "Hemograma")
        }
    }

    #[test]
    fn test_create_order_defaults() {
        let h = Harness::new();
        let order = h.lifecycle().create_order(h.new_order()).unwrap();

        assert_eq!(order.state, OrderState::Pending);
        assert_eq!(order.priority, Priority::Normal);
        assert_eq!(order.ordered_on, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(h.notifier.kinds(), vec![EventKind::OrderCreated]);
    }

    #[test]
    fn test_orders_for_pet_newest_first() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let first = lc.create_order(h.new_order()).unwrap();
        h.clock.advance(chrono::Duration::hours(1));
        let second = lc.create_order(h.new_order()).unwrap();

        let history = lc.orders_for_pet(&h.seed.pet_id).unwrap();
        let ids: Vec<_> = history.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        assert!(matches!(lc.orders_for_pet("ghost"), Err(LabError::NotFound(_))));
    }

    #[test]
    fn test_create_order_requires_fields() {
        let h = Harness::new();
        let lc = h.lifecycle();

        let mut missing_exam = h.new_order();
        missing_exam.exam_type = "  ".into();
        assert!(matches!(lc.create_order(missing_exam), Err(LabError::Validation(_))));

        let mut missing_pet = h.new_order();
        missing_pet.pet_id = String::new();
        assert!(matches!(lc.create_order(missing_pet), Err(LabError::Validation(_))));

        let mut unknown_vet = h.new_order();
        unknown_vet.vet_id = "nobody".into();
        assert!(matches!(lc.create_order(unknown_vet), Err(LabError::NotFound(_))));
        assert!(h.notifier.events().is_empty());
    }

    #[test]
    fn test_schedule_sample_moves_order_in_progress() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();

        let sample = lc
            .schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Sangre"))
            .unwrap();
        assert_eq!(sample.state, SampleState::Scheduled);
        assert!(sample.sample_code.starts_with("TM-"));
        assert_eq!(sample.scheduled_at, h.clock.now());

        let stored = h.db.get_order(&order.id).unwrap().unwrap();
        assert_eq!(stored.state, OrderState::InProgress);
    }

    #[test]
    fn test_second_sample_conflicts_and_leaves_state() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        lc.schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Sangre"))
            .unwrap();

        let err = lc
            .schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Orina"))
            .unwrap_err();
        assert!(matches!(err, LabError::Conflict(_)));
        assert_eq!(h.db.list_samples().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_sample_does_not_move_order() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();

        let err = lc
            .schedule_sample(&order.id, NewSample::new("ghost", "Sangre"))
            .unwrap_err();
        assert!(matches!(err, LabError::NotFound(_)));
        assert_eq!(
            h.db.get_order(&order.id).unwrap().unwrap().state,
            OrderState::Pending
        );
    }

    #[test]
    fn test_sample_on_closed_order_rejected() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        lc.cancel_order(&order.id).unwrap();

        let err = lc
            .schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Sangre"))
            .unwrap_err();
        assert!(matches!(
            err,
            LabError::IllegalTransition(TransitionError::OrderClosed { .. })
        ));
    }

    #[test]
    fn test_register_result_ignores_caller_flags() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();

        let result = lc
            .register_result(
                &order.id,
                NewResult {
                    validated: true,
                    delivered: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!result.validated);
        assert!(!result.delivered);

        let stored = h.db.get_result(&result.id).unwrap().unwrap();
        assert!(!stored.validated);
    }

    #[test]
    fn test_register_result_unknown_order() {
        let h = Harness::new();
        let err = h
            .lifecycle()
            .register_result("missing", NewResult::default())
            .unwrap_err();
        assert!(matches!(err, LabError::NotFound(_)));
    }

    #[test]
    fn test_validate_twice_fails() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        let result = lc.register_result(&order.id, NewResult::default()).unwrap();

        lc.validate_result(&result.id).unwrap();
        let err = lc.validate_result(&result.id).unwrap_err();
        assert!(matches!(
            err,
            LabError::IllegalTransition(TransitionError::AlreadyValidated(_))
        ));
    }

    #[test]
    fn test_validation_completes_order_despite_siblings() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        let first = lc.register_result(&order.id, NewResult::default()).unwrap();
        lc.register_result(&order.id, NewResult::default()).unwrap();

        lc.validate_result(&first.id).unwrap();
        assert_eq!(
            h.db.get_order(&order.id).unwrap().unwrap().state,
            OrderState::Completed
        );
        assert_eq!(lc.results_pending_validation().unwrap().len(), 1);
    }

    #[test]
    fn test_deliver_requires_validation() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        let result = lc.register_result(&order.id, NewResult::default()).unwrap();

        let err = lc.deliver_result(&result.id).unwrap_err();
        assert!(matches!(
            err,
            LabError::IllegalTransition(TransitionError::NotValidated(_))
        ));
    }

    #[test]
    fn test_delete_validated_result_conflicts() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        let draft = lc.register_result(&order.id, NewResult::default()).unwrap();
        let signed = lc.register_result(&order.id, NewResult::default()).unwrap();
        lc.validate_result(&signed.id).unwrap();

        lc.delete_result(&draft.id).unwrap();
        assert!(matches!(lc.delete_result(&signed.id), Err(LabError::Conflict(_))));
    }

    #[test]
    fn test_cancel_completed_order_rejected() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        lc.change_state(&order.id, "completada").unwrap();

        let err = lc.cancel_order(&order.id).unwrap_err();
        assert!(matches!(
            err,
            LabError::IllegalTransition(TransitionError::OrderClosed { .. })
        ));
    }

    #[test]
    fn test_change_state_is_permissive_within_vocabulary() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();

        lc.change_state(&order.id, "COMPLETADA").unwrap();
        let reopened = lc.change_state(&order.id, "pending").unwrap();
        assert_eq!(reopened.state, OrderState::Pending);

        assert!(matches!(
            lc.change_state(&order.id, "ARCHIVADA"),
            Err(LabError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_order_guarded_by_results() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        lc.schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Sangre"))
            .unwrap();
        let result = lc.register_result(&order.id, NewResult::default()).unwrap();

        assert!(matches!(lc.delete_order(&order.id), Err(LabError::Conflict(_))));

        lc.delete_result(&result.id).unwrap();
        lc.delete_order(&order.id).unwrap();
        assert!(h.db.get_order(&order.id).unwrap().is_none());
        assert!(h.db.list_samples().unwrap().is_empty());
    }

    #[test]
    fn test_mark_sample_taken_uses_clock() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let order = lc.create_order(h.new_order()).unwrap();
        let sample = lc
            .schedule_sample(&order.id, NewSample::new(&h.seed.tech_id, "Sangre"))
            .unwrap();

        h.clock.advance(chrono::Duration::minutes(20));
        let taken = lc.mark_sample_taken(&sample.id).unwrap();
        assert_eq!(taken.state, SampleState::Taken);
        assert_eq!(taken.taken_at, Some(h.clock.now()));
    }

    #[test]
    fn test_urgent_open_orders() {
        let h = Harness::new();
        let lc = h.lifecycle();
        let mut urgent = h.new_order();
        urgent.priority = Some(Priority::Urgent);
        let urgent = lc.create_order(urgent).unwrap();
        lc.create_order(h.new_order()).unwrap();

        let found = lc.urgent_open_orders().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, urgent.id);

        lc.cancel_order(&urgent.id).unwrap();
        assert!(lc.urgent_open_orders().unwrap().is_empty());
    }

    struct Failing;

    impl Notifier for Failing {
        fn notify(&self, _event: &LabEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("gateway down".into()))
        }
    }

    #[test]
    fn test_notifier_failure_does_not_fail_operation() {
        let h = Harness::new();
        let lc = OrderLifecycle::new(&h.db, &h.clock, &Failing, &h.config);
        let order = lc.create_order(h.new_order()).unwrap();
        assert!(h.db.get_order(&order.id).unwrap().is_some());
    }
}
