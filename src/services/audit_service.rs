// src/services/audit_service.rs

use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AlertRepository, AuditRepository, Reference, ReferenceRepository, TemplateRepository},
    models::{
        action::Urgency,
        alert::NewAlert,
        audit::{Audit, AuditChanges, AuditDetail, AuditStatus, NewAudit, ResultInput},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub pass_percentage: Decimal,
    pub passed: bool,
}

/// aprovados / (aprovados + reprovados) * 100, arredondado em 2 casas (metade para longe do zero).
/// Itens "não se aplica" (`passed: None`) não contam para nenhum lado; um checklist
/// sem nada aplicável vale 100.
pub fn score(results: &[ResultInput], pass_threshold: Decimal) -> Score {
    let passed = results.iter().filter(|r| r.passed == Some(true)).count();
    let failed = results.iter().filter(|r| r.passed == Some(false)).count();
    let applicable = passed + failed;

    let pass_percentage = if applicable == 0 {
        Decimal::ONE_HUNDRED
    } else {
        (Decimal::from(passed as u64) * Decimal::ONE_HUNDRED / Decimal::from(applicable as u64))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    Score { pass_percentage, passed: pass_percentage >= pass_threshold }
}

/// Mudança de status fora do `/complete`: auditoria fechada continua fechada,
/// e só a pontuação pode marcar uma auditoria como concluída.
pub fn check_status_change(current: AuditStatus, requested: Option<AuditStatus>) -> Result<(), AppError> {
    let Some(requested) = requested else {
        return Ok(());
    };
    if current.is_closed() {
        return Err(AppError::Conflict("errors.audit_closed"));
    }
    if requested == AuditStatus::Completed {
        return Err(AppError::field("status", "completed_via_complete", "validation.completed_via_complete"));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct AuditService {
    audit_repo: AuditRepository,
    template_repo: TemplateRepository,
    alert_repo: AlertRepository,
}

impl AuditService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_detail<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<AuditDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let audit = self
            .audit_repo
            .find_row(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("audit".into()))?;
        let results = self.audit_repo.results(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(AuditDetail { audit, results })
    }

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, new: &NewAudit) -> Result<Audit, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // 1. Transação: as verificações e o INSERT veem o mesmo estado
        let mut tx = executor.begin().await?;

        // 2. Local e modelo precisam ser da mesma organização (a FK sozinha não garante isso)
        let refs = ReferenceRepository;
        refs.require(&mut *tx, organization_id, Reference::Location, new.location_id).await?;
        refs.require(&mut *tx, organization_id, Reference::Template, new.template_id).await?;

        // 3. Cria o rascunho
        let audit = self.audit_repo.create(&mut *tx, organization_id, new).await?;

        tx.commit().await?;
        Ok(audit)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        changes: &AuditChanges,
    ) -> Result<Audit, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Trava a linha para ler o status atual
        let current = self
            .audit_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("audit".into()))?;
        // 2. Regra de status
        check_status_change(current.status, changes.status)?;

        // 3. Aplica as mudanças
        let audit = self
            .audit_repo
            .update(&mut *tx, organization_id, id, changes)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("audit".into()))?;

        tx.commit().await?;
        Ok(audit)
    }

    /// Substitui os resultados, calcula a nota contra o limite do modelo e fecha
    /// a auditoria. Nota abaixo do limite gera um alerta para o local.
    pub async fn complete<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        audit_id: Uuid,
        results: &[ResultInput],
    ) -> Result<Audit, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // 1. Iniciamos uma transação: resultados, nota e alerta entram juntos
        let mut tx = executor.begin().await?;

        // 2. Busca a auditoria travando a linha
        let audit = self
            .audit_repo
            .find_for_update(&mut *tx, organization_id, audit_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("audit".into()))?;

        if audit.status.is_closed() {
            return Err(AppError::Conflict("errors.audit_closed"));
        }

        // 3. Os resultados só podem apontar para itens do modelo da auditoria
        let template = self
            .template_repo
            .find(&mut *tx, organization_id, audit.template_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("template".into()))?;

        let known: HashSet<Uuid> = self
            .template_repo
            .item_ids(&mut *tx, template.id)
            .await?
            .into_iter()
            .collect();
        check_items(results, &known)?;

        // 4. Troca os resultados
        self.audit_repo.clear_results(&mut *tx, audit_id).await?;
        for result in results {
            self.audit_repo
                .insert_result(&mut *tx, organization_id, audit_id, result)
                .await?;
        }

        // 5. Nota e conclusão
        let score = score(results, template.pass_threshold);
        let completed = self
            .audit_repo
            .mark_completed(&mut *tx, organization_id, audit_id, score.pass_percentage, score.passed)
            .await?;

        // 6. Reprovou: alerta para o local
        if !score.passed {
            tracing::info!(audit_id = %audit_id, score = %score.pass_percentage, "Audit failed, raising alert");
            let alert = NewAlert {
                location_id: Some(audit.location_id),
                audit_id: Some(audit_id),
                severity: Urgency::High,
                title: format!("Audit failed: {}", template.name),
                message: Some(format!(
                    "Scored {}% against a pass threshold of {}%",
                    score.pass_percentage, template.pass_threshold
                )),
            };
            self.alert_repo.create(&mut *tx, organization_id, &alert).await?;
        }

        // 7. Salva tudo
        tx.commit().await?;
        Ok(completed)
    }
}

fn check_items(results: &[ResultInput], known: &HashSet<Uuid>) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for result in results {
        if !known.contains(&result.item_id) || !seen.insert(result.item_id) {
            return Err(AppError::field("results", "unknown_template_item", "errors.unknown_template_item"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: Option<bool>) -> ResultInput {
        ResultInput { item_id: Uuid::new_v4(), passed, notes: None }
    }

    #[test]
    fn only_scoring_completes_an_audit() {
        let err = check_status_change(AuditStatus::InProgress, Some(AuditStatus::Completed)).unwrap_err();
        match err {
            AppError::ValidationError(errors) => assert!(errors.field_errors().contains_key("status")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_status_change(AuditStatus::Draft, Some(AuditStatus::InProgress)).is_ok());
        assert!(check_status_change(AuditStatus::Draft, Some(AuditStatus::Cancelled)).is_ok());
    }

    #[test]
    fn closed_audits_cannot_be_reopened() {
        for closed in [AuditStatus::Completed, AuditStatus::Cancelled] {
            let err = check_status_change(closed, Some(AuditStatus::Draft)).unwrap_err();
            assert!(matches!(err, AppError::Conflict("errors.audit_closed")));
        }
        // notes and dates stay editable
        assert!(check_status_change(AuditStatus::Completed, None).is_ok());
    }

    #[test]
    fn not_applicable_items_are_ignored() {
        let results = vec![result(Some(true)), result(Some(true)), result(Some(false)), result(None)];
        let s = score(&results, Decimal::from(60));
        assert_eq!(s.pass_percentage, Decimal::new(6667, 2));
        assert!(s.passed);
    }

    #[test]
    fn threshold_is_inclusive() {
        let results = vec![result(Some(true)), result(Some(true)), result(Some(true)), result(Some(false))];
        assert!(score(&results, Decimal::from(75)).passed);
        assert!(!score(&results, Decimal::new(7501, 2)).passed);
    }

    #[test]
    fn midpoints_round_away_from_zero() {
        // 1 of 32 = 3.125%
        let mut results = vec![result(Some(true))];
        results.extend((0..31).map(|_| result(Some(false))));
        assert_eq!(score(&results, Decimal::ZERO).pass_percentage, Decimal::new(313, 2));
    }

    #[test]
    fn nothing_applicable_scores_full_marks() {
        let s = score(&[result(None)], Decimal::from(80));
        assert_eq!(s.pass_percentage, Decimal::ONE_HUNDRED);
        assert!(s.passed);
    }

    #[test]
    fn rejects_items_outside_the_template_and_duplicates() {
        let item = Uuid::new_v4();
        let known: HashSet<Uuid> = [item].into_iter().collect();
        let ok = ResultInput { item_id: item, passed: Some(true), notes: None };

        assert!(check_items(std::slice::from_ref(&ok), &known).is_ok());
        assert!(check_items(&[result(Some(true))], &known).is_err());
        assert!(check_items(&[ok.clone(), ok], &known).is_err());
    }

    mod store {
        use super::*;
        use crate::db::fixtures;
        use chrono::NaiveDate;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

        fn draft(location_id: Uuid, template_id: Uuid) -> NewAudit {
            NewAudit {
                location_id,
                template_id,
                inspector_id: None,
                audit_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                notes: None,
            }
        }

        fn status(status: AuditStatus) -> AuditChanges {
            AuditChanges { status: Some(status), ..Default::default() }
        }

        #[sqlx::test]
        async fn edits_cannot_complete_or_reopen_an_audit(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
            let pool = fixtures::pool(options, connect).await;
            let org = fixtures::organization(&pool, "org_a").await;
            let location = fixtures::location(&pool, org, "Main kitchen").await;
            let (template, items) = fixtures::template(&pool, org, 1).await;
            let service = AuditService::new();
            let mut conn = pool.acquire().await?;

            let audit = service.create(&mut *conn, org, &draft(location, template)).await?;
            let err = service.update(&mut *conn, org, audit.id, &status(AuditStatus::Completed)).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));

            let results = [ResultInput { item_id: items[0], passed: Some(true), notes: None }];
            service.complete(&mut *conn, org, audit.id, &results).await?;

            let err = service.update(&mut *conn, org, audit.id, &status(AuditStatus::Draft)).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict("errors.audit_closed")));

            let stored = AuditRepository.find_row(&mut *conn, org, audit.id).await?.unwrap().audit;
            assert_eq!(stored.status, AuditStatus::Completed);
            assert_eq!(stored.pass_percentage, Some(Decimal::ONE_HUNDRED));
            assert_eq!(stored.passed, Some(true));
            Ok(())
        }

        #[sqlx::test]
        async fn references_must_belong_to_the_organization(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
            let pool = fixtures::pool(options, connect).await;
            let org_a = fixtures::organization(&pool, "org_a").await;
            let org_b = fixtures::organization(&pool, "org_b").await;
            let own_location = fixtures::location(&pool, org_a, "Main kitchen").await;
            let (own_template, _) = fixtures::template(&pool, org_a, 1).await;
            let foreign_location = fixtures::location(&pool, org_b, "Bar").await;
            let service = AuditService::new();
            let mut conn = pool.acquire().await?;

            for location in [foreign_location, Uuid::new_v4()] {
                let err = service.create(&mut *conn, org_a, &draft(location, own_template)).await.unwrap_err();
                match err {
                    AppError::ValidationError(errors) => assert!(errors.field_errors().contains_key("locationId")),
                    other => panic!("unexpected {other:?}"),
                }
            }

            let audits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audits")
                .fetch_one(&mut *conn)
                .await?;
            assert_eq!(audits, 0);

            assert!(service.create(&mut *conn, org_a, &draft(own_location, own_template)).await.is_ok());
            Ok(())
        }
    }
}
