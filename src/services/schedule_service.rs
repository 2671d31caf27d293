// src/services/schedule_service.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ScheduleRepository,
    models::schedule::{OutOfRange, ScheduledAudit},
};

#[derive(Clone, Default)]
pub struct ScheduleService {
    schedule_repo: ScheduleRepository,
}

impl ScheduleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uma execução em `ran_on` e move o agendamento para a próxima
    /// ocorrência, contada a partir da data prevista. Agendamentos únicos são desativados.
    pub async fn advance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        ran_on: NaiveDate,
        today: NaiveDate,
    ) -> Result<ScheduledAudit, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // 1. Execução no futuro não existe
        check_ran_on(ran_on, today)?;

        let mut tx = executor.begin().await?;

        // 2. Busca o agendamento

        let schedule = self
            .schedule_repo
            .find(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("scheduled audit".into()))?;

        // 3. Próxima data (erro se sair do calendário, nunca desativa em silêncio)
        let next = next_run(&schedule, ran_on)?;

        // 4. Salva a execução

        let updated = self
            .schedule_repo
            .record_run(&mut *tx, organization_id, id, ran_on, next)
            .await?;

        tx.commit().await?;
        tracing::info!(schedule_id = %id, next = ?updated.next_scheduled_date, active = updated.is_active, "Scheduled audit advanced");
        Ok(updated)
    }
}

fn check_ran_on(ran_on: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if ran_on > today {
        return Err(AppError::field("ranOn", "future_run", "validation.future_run"));
    }
    Ok(())
}

/// Próxima data depois da data prevista e da execução, para que uma execução
/// atrasada não deixe o agendamento vencido no passado. `None` só para agendamentos únicos.
fn next_run(schedule: &ScheduledAudit, ran_on: NaiveDate) -> Result<Option<NaiveDate>, AppError> {
    let floor = schedule.next_scheduled_date.max(ran_on);
    schedule
        .recurrence
        .next_after(schedule.anchor_date, floor)
        .map_err(|OutOfRange| AppError::Conflict("errors.schedule_overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::Recurrence;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(recurrence: Recurrence, anchor: NaiveDate, due: NaiveDate) -> ScheduledAudit {
        let now = chrono::Utc::now();
        ScheduledAudit {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            name: "Weekly kitchen check".into(),
            location_id: Uuid::nil(),
            template_id: Uuid::nil(),
            inspector_id: None,
            recurrence,
            is_active: true,
            next_scheduled_date: due,
            anchor_date: anchor,
            last_run_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn on_time_runs_step_once() {
        let due = date(2024, 5, 6);
        let s = schedule(Recurrence::Weekly, due, due);
        assert_eq!(next_run(&s, due).unwrap(), Some(date(2024, 5, 13)));
    }

    #[test]
    fn early_runs_still_move_past_the_due_date() {
        let due = date(2024, 5, 6);
        let s = schedule(Recurrence::Weekly, date(2024, 4, 29), due);
        assert_eq!(next_run(&s, date(2024, 5, 2)).unwrap(), Some(date(2024, 5, 13)));
    }

    #[test]
    fn late_runs_skip_missed_occurrences() {
        let due = date(2024, 5, 6);
        let s = schedule(Recurrence::Weekly, due, due);
        assert_eq!(next_run(&s, date(2024, 5, 20)).unwrap(), Some(date(2024, 5, 27)));
    }

    #[test]
    fn monthly_series_return_to_the_anchor_day() {
        let s = schedule(Recurrence::Monthly, date(2024, 1, 31), date(2024, 2, 29));
        assert_eq!(next_run(&s, date(2024, 2, 29)).unwrap(), Some(date(2024, 3, 31)));
    }

    #[test]
    fn once_has_no_next_date() {
        let due = date(2024, 5, 6);
        let s = schedule(Recurrence::Once, due, due);
        assert_eq!(next_run(&s, due).unwrap(), None);
    }

    #[test]
    fn future_runs_are_rejected() {
        let today = date(2024, 5, 6);
        assert!(check_ran_on(today, today).is_ok());
        let err = check_ran_on(NaiveDate::MAX, today).unwrap_err();
        match err {
            AppError::ValidationError(errors) => assert!(errors.field_errors().contains_key("ranOn")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn calendar_overflow_is_an_error_not_a_deactivation() {
        let s = schedule(Recurrence::Daily, date(2024, 5, 6), NaiveDate::MAX);
        assert!(matches!(next_run(&s, date(2024, 5, 6)), Err(AppError::Conflict("errors.schedule_overflow"))));
    }
}
