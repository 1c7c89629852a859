// storefront/src/db/addresses.rs

use crate::errors::Result;
use crate::models::{Address, NewAddress};
use sqlx::PgExecutor;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, line1, line2, city, region, postal_code, country, phone, created_at";

pub async fn create<'e>(ex: impl PgExecutor<'e>, user_id: Uuid, input: &NewAddress) -> Result<Address> {
  input.validate()?;
  let sql = format!(
    "INSERT INTO addresses (id, user_id, line1, line2, city, region, postal_code, country, phone) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
    COLUMNS
  );
  Ok(
    sqlx::query_as::<_, Address>(&sql)
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(input.line1.trim())
      .bind(input.line2.as_deref())
      .bind(input.city.trim())
      .bind(input.region.trim())
      .bind(input.postal_code.as_deref())
      .bind(input.country.trim().to_uppercase())
      .bind(input.phone.as_deref())
      .fetch_one(ex)
      .await?,
  )
}
