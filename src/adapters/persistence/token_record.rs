use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::PortResult,
    domain::entities::{
        token_record::{InsertOutcome, TokenRecord},
        user_profile::{BrandInfo, UserProfile},
    },
    use_cases::token_validator::TokenRepository,
};

#[async_trait]
impl TokenRepository for PostgresPersistence {
    async fn find_by_app_token(
        &self,
        app_id: &str,
        token_hash: &str,
    ) -> PortResult<Option<TokenRecord>> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"SELECT app_id, user_id, token_hash
               FROM login_tokens
               WHERE app_id = $1 AND token_hash = $2"#,
        )
        .bind(app_id)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_user(&self, user_id: &str) -> PortResult<Vec<TokenRecord>> {
        let records = sqlx::query_as::<_, TokenRecord>(
            r#"SELECT app_id, user_id, token_hash
               FROM login_tokens
               WHERE user_id = $1
               ORDER BY created_at"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn transactional_insert(
        &self,
        brand: &BrandInfo,
        profile: &UserProfile,
        record: &TokenRecord,
    ) -> PortResult<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO user_profiles (user_id, email, first_name, last_name, region)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id) DO UPDATE SET
                   email = EXCLUDED.email,
                   first_name = EXCLUDED.first_name,
                   last_name = EXCLUDED.last_name,
                   region = EXCLUDED.region,
                   updated_at = now()"#,
        )
        .bind(&profile.user_id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.region)
        .execute(&mut *tx)
        .await?;

        // The subscription flag belongs to billing once the row exists.
        sqlx::query(
            r#"INSERT INTO user_brands (user_id, app_id, brand, subscribed, registered_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id, app_id) DO UPDATE SET
                   brand = EXCLUDED.brand,
                   registered_at = COALESCE(EXCLUDED.registered_at, user_brands.registered_at)"#,
        )
        .bind(&brand.user_id)
        .bind(&brand.app_id)
        .bind(&brand.brand)
        .bind(brand.subscribed)
        .bind(brand.registered_at)
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"INSERT INTO login_tokens (app_id, token_hash, user_id)
               VALUES ($1, $2, $3)
               ON CONFLICT (app_id, token_hash) DO NOTHING"#,
        )
        .bind(&record.app_id)
        .bind(&record.token_hash)
        .bind(&record.user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // A concurrent login won; leave its rows untouched.
            tx.rollback().await?;
            return Ok(InsertOutcome::AlreadyExists);
        }

        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }
}
