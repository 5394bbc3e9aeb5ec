use sqlx::PgPool;

pub(crate) struct EnqueueEmail<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub recipient: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub survey_id: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn enqueue(
    executor: impl sqlx::PgExecutor<'_>,
    params: EnqueueEmail<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO email_outbox (id, kind, recipient, subject, body, survey_id, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(params.id)
    .bind(params.kind)
    .bind(params.recipient)
    .bind(params.subject)
    .bind(params.body)
    .bind(params.survey_id)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn count_for_survey(
    pool: &PgPool,
    kind: &str,
    survey_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM email_outbox WHERE kind = $1 AND survey_id = $2",
    )
    .bind(kind)
    .bind(survey_id)
    .fetch_one(pool)
    .await
}
