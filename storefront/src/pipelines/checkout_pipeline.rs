// storefront/src/pipelines/checkout_pipeline.rs

use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::users::UserProfile;
use crate::db::{addresses, coupons, orders, products, users};
use crate::errors::{AppError, Result};
use crate::models::{new_reference, normalize_email, PaymentMethod, PaymentStatus};
use crate::pipelines::contexts::{CheckoutCtx, CheckoutRequest, PaymentCtx, PaymentInput};
use crate::pipelines::payment_flows::{card_flow, nequi_flow, pse_flow};
use crate::pipelines::reconcile;
use crate::pricing::{price_order, LineItem, ShippingPolicy};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tienda_flow::{ContextData, Flow, FlowControl, FlowError, FlowRegistry};
use tracing::{info, instrument};
use uuid::Uuid;

pub const VALIDATE_CHECKOUT_REQUEST: &str = "validate_checkout_request";
pub const UPSERT_CUSTOMER: &str = "upsert_customer";
pub const CREATE_ORDER: &str = "create_order";
pub const PREPARE_PAYMENT: &str = "prepare_payment";
pub const PROCESS_PAYMENT: &str = "process_payment";
pub const RECONCILE_ORDER: &str = "reconcile_order";

const MAX_ITEMS: usize = 50;
const MAX_QUANTITY: i32 = 10_000;

pub fn register_checkout_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register(checkout_flow());
}

pub fn checkout_flow() -> Flow<CheckoutCtx, AppError> {
  let mut flow = Flow::<CheckoutCtx, AppError>::new(&[
    (VALIDATE_CHECKOUT_REQUEST, false, None),
    (UPSERT_CUSTOMER, false, None),
    (CREATE_ORDER, false, None),
    (PREPARE_PAYMENT, false, None),
    (PROCESS_PAYMENT, false, None),
    (RECONCILE_ORDER, false, None),
  ]);

  flow.on(VALIDATE_CHECKOUT_REQUEST, |ctx: ContextData<CheckoutCtx>| async move {
    validate_request(&ctx.read().request)?;
    Ok::<_, AppError>(FlowControl::Continue)
  });
  flow.on(UPSERT_CUSTOMER, upsert_customer);
  flow.on(CREATE_ORDER, create_order);
  flow.on(PREPARE_PAYMENT, prepare_payment);

  let card = Arc::new(card_flow());
  let pse = Arc::new(pse_flow());
  let nequi = Arc::new(nequi_flow());
  flow
    .branch(PROCESS_PAYMENT)
    .arm(card, payment_sub_context)
    .when(|ctx| ctx.read().payment_method() == PaymentMethod::Card)
    .arm(pse, payment_sub_context)
    .when(|ctx| ctx.read().payment_method() == PaymentMethod::Pse)
    .arm(nequi, payment_sub_context)
    .when(|ctx| ctx.read().payment_method() == PaymentMethod::Nequi)
    .fail_if_no_arm_matches()
    .finalize();

  flow.on(RECONCILE_ORDER, reconcile_order);
  flow
}

fn payment_sub_context(ctx: ContextData<CheckoutCtx>) -> std::result::Result<ContextData<PaymentCtx>, FlowError> {
  ctx
    .read()
    .payment
    .clone()
    .ok_or_else(|| FlowError::Internal("Payment context was not prepared.".to_string()))
}

fn is_digits(value: &str, lengths: std::ops::RangeInclusive<usize>) -> bool {
  lengths.contains(&value.len()) && value.chars().all(|c| c.is_ascii_digit())
}

/// Checks everything that can be checked without the database.
pub fn validate_request(request: &CheckoutRequest) -> Result<()> {
  if request.items.is_empty() {
    return Err(AppError::Validation("Checkout needs at least one item.".to_string()));
  }
  if request.items.len() > MAX_ITEMS {
    return Err(AppError::Validation(format!("At most {} items per order.", MAX_ITEMS)));
  }
  if let Some(item) = request.items.iter().find(|i| i.quantity <= 0) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be positive.",
      item.product_id
    )));
  }
  if normalize_email(&request.customer.email).is_none() {
    return Err(AppError::Validation("A valid customer e-mail is required.".to_string()));
  }
  if request.customer.full_name.trim().is_empty() {
    return Err(AppError::Validation("Customer name is required.".to_string()));
  }
  request.shipping_address.validate()?;
  merge_items(request)?;

  match &request.payment {
    PaymentInput::Card(card) => {
      if !is_digits(&card.digits(), 13..=19) {
        return Err(AppError::Validation("Card number must have 13 to 19 digits.".to_string()));
      }
      if !is_digits(card.cvc.trim(), 3..=4) {
        return Err(AppError::Validation("Card CVC must have 3 or 4 digits.".to_string()));
      }
      let month_ok = card.exp_month.trim().parse::<u8>().is_ok_and(|m| (1..=12).contains(&m));
      if !month_ok || !is_digits(card.exp_year.trim(), 2..=2) {
        return Err(AppError::Validation("Card expiry must be MM and YY.".to_string()));
      }
      if card.card_holder.trim().len() < 5 {
        return Err(AppError::Validation("Card holder name is required.".to_string()));
      }
    }
    PaymentInput::Pse(pse) => {
      if pse.user_type > 1 {
        return Err(AppError::Validation("PSE user_type must be 0 (person) or 1 (company).".to_string()));
      }
      if pse.user_legal_id_type.trim().is_empty() || pse.user_legal_id.trim().is_empty() {
        return Err(AppError::Validation("PSE payments need the payer's legal id.".to_string()));
      }
      let bank = pse.financial_institution_code.trim();
      if bank.is_empty() || bank == "0" {
        return Err(AppError::Validation("Select a bank for the PSE payment.".to_string()));
      }
    }
    PaymentInput::Nequi { phone_number } => {
      if !is_digits(phone_number.trim(), 10..=10) {
        return Err(AppError::Validation("Nequi phone number must have 10 digits.".to_string()));
      }
    }
  }
  Ok(())
}

/// Adds up quantities of repeated products.
pub fn merge_items(request: &CheckoutRequest) -> Result<BTreeMap<Uuid, i32>> {
  let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
  for item in &request.items {
    let total = merged.entry(item.product_id).or_insert(0);
    *total = total
      .checked_add(item.quantity)
      .filter(|q| *q <= MAX_QUANTITY)
      .ok_or_else(|| {
        AppError::Validation(format!(
          "At most {} units of product {} per order.",
          MAX_QUANTITY, item.product_id
        ))
      })?;
  }
  Ok(merged)
}

#[instrument(name = "checkout::upsert_customer", skip_all)]
async fn upsert_customer(ctx: ContextData<CheckoutCtx>) -> Result<FlowControl> {
  let (pool, request, authenticated) = {
    let guard = ctx.read();
    (guard.app_state.db_pool.clone(), guard.request.clone(), guard.authenticated_user_id)
  };

  let customer = match authenticated {
    Some(user_id) => users::find(&pool, user_id).await?,
    None => {
      let profile = UserProfile {
        email: normalize_email(&request.customer.email)
          .ok_or_else(|| AppError::Validation("A valid customer e-mail is required.".to_string()))?,
        full_name: request.customer.full_name.trim().to_string(),
        phone: request.customer.phone.clone(),
        legal_id_type: request.customer.legal_id_type.clone(),
        legal_id: request.customer.legal_id.clone(),
      };
      users::upsert_guest(&pool, &profile).await?
    }
  };
  let address = addresses::create(&pool, customer.id, &request.shipping_address).await?;
  info!(user_id = %customer.id, guest = customer.is_guest(), "Checkout customer resolved.");

  let mut guard = ctx.write();
  guard.customer = Some(customer);
  guard.address_id = Some(address.id);
  Ok(FlowControl::Continue)
}

#[instrument(name = "checkout::create_order", skip_all)]
async fn create_order(ctx: ContextData<CheckoutCtx>) -> Result<FlowControl> {
  let (state, request, user_id, address_id) = {
    let guard = ctx.read();
    let user_id = guard
      .customer
      .as_ref()
      .map(|c| c.id)
      .ok_or_else(|| AppError::Internal("Order creation before customer was resolved.".to_string()))?;
    (guard.app_state.clone(), guard.request.clone(), user_id, guard.address_id)
  };

  let wanted = merge_items(&request)?;
  let ids: Vec<Uuid> = wanted.keys().copied().collect();
  let catalog: HashMap<Uuid, _> = products::find_many(&state.db_pool, &ids)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

  let mut line_items = Vec::with_capacity(wanted.len());
  let mut order_items = Vec::with_capacity(wanted.len());
  for (product_id, quantity) in &wanted {
    let product = catalog
      .get(product_id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
    if !product.is_active {
      return Err(AppError::Validation(format!("{} is no longer available.", product.name)));
    }
    if !product.can_fulfil(*quantity) {
      return Err(AppError::Conflict(format!(
        "Only {} unit(s) of {} in stock.",
        product.stock_quantity, product.name
      )));
    }
    line_items.push(LineItem {
      unit_price_cents: product.price_cents,
      quantity: *quantity,
    });
    order_items.push(NewOrderItem {
      product_id: *product_id,
      quantity: *quantity,
      unit_price_cents: product.price_cents,
    });
  }

  let coupon = match request.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
    Some(code) => Some(coupons::find_by_code(&state.db_pool, code).await?),
    None => None,
  };
  let now = Utc::now();
  let price = price_order(
    &line_items,
    coupon.as_ref(),
    ShippingPolicy::from_config(&state.config),
    now,
  )?;

  let new_order = NewOrder {
    user_id,
    address_id,
    coupon_id: coupon.as_ref().map(|c| c.id),
    price,
    currency: state.config.store_currency.clone(),
    reference: new_reference(now),
  };
  let mut tx = state.db_pool.begin().await?;
  let order = orders::insert_with_items(&mut *tx, &new_order, &order_items).await?;
  tx.commit().await?;
  info!(order_id = %order.id, reference = %order.reference, total = order.total_cents, "Order created.");

  ctx.write().order = Some(order);
  Ok(FlowControl::Continue)
}

#[instrument(name = "checkout::prepare_payment", skip_all)]
async fn prepare_payment(ctx: ContextData<CheckoutCtx>) -> Result<FlowControl> {
  let mut guard = ctx.write();
  let order = guard
    .order
    .clone()
    .ok_or_else(|| AppError::Internal("Payment prepared before order creation.".to_string()))?;
  let customer = guard
    .customer
    .clone()
    .ok_or_else(|| AppError::Internal("Payment prepared before customer resolution.".to_string()))?;
  let config = guard.app_state.config.clone();
  let instrument = guard.request.payment.clone();
  let redirect_url = match instrument {
    PaymentInput::Pse(_) => config.gateway.pse_redirect_url.clone(),
    _ => None,
  };

  let payment = PaymentCtx {
    gateway: guard.app_state.gateway.clone(),
    poll: config.payment_poll,
    instrument,
    amount_in_cents: order.total_cents,
    currency: order.currency.clone(),
    reference: order.reference.clone(),
    customer_email: customer.email.clone(),
    customer_full_name: customer.full_name.clone(),
    customer_phone: customer.phone.clone().or_else(|| guard.request.customer.phone.clone()),
    redirect_url,
    acceptance_token: None,
    card_token: None,
    transaction: None,
    status: PaymentStatus::Pending,
    status_message: None,
    poll_attempts: 0,
    failure: None,
  };
  guard.payment = Some(ContextData::new(payment));
  Ok(FlowControl::Continue)
}

#[instrument(name = "checkout::reconcile_order", skip_all)]
async fn reconcile_order(ctx: ContextData<CheckoutCtx>) -> Result<FlowControl> {
  let (pool, payment) = {
    let guard = ctx.read();
    let payment = guard
      .payment
      .clone()
      .ok_or_else(|| AppError::Internal("Reconcile reached without payment context.".to_string()))?;
    (guard.app_state.db_pool.clone(), payment)
  };
  let update = payment.read().to_update();
  let outcome = reconcile::apply_transaction(&pool, &update).await?;
  ctx.write().outcome = Some(outcome);
  Ok(FlowControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::NewAddress;
  use crate::pipelines::contexts::{CheckoutItemInput, CustomerInput};
  use crate::services::gateway::{CardDetails, PseDetails};

  fn request(payment: PaymentInput) -> CheckoutRequest {
    CheckoutRequest {
      customer: CustomerInput {
        email: "Ana@Example.com".into(),
        full_name: "Ana Pérez".into(),
        phone: None,
        legal_id_type: None,
        legal_id: None,
      },
      shipping_address: NewAddress {
        line1: "Calle 10 # 5-20".into(),
        line2: None,
        city: "Medellín".into(),
        region: "Antioquia".into(),
        postal_code: None,
        country: "CO".into(),
        phone: None,
      },
      items: vec![CheckoutItemInput {
        product_id: Uuid::nil(),
        quantity: 1,
      }],
      coupon_code: None,
      payment,
    }
  }

  fn card() -> CardDetails {
    CardDetails {
      number: "4242 4242 4242 4242".into(),
      cvc: "123".into(),
      exp_month: "08".into(),
      exp_year: "29".into(),
      card_holder: "Ana Pérez".into(),
      installments: 1,
    }
  }

  #[test]
  fn valid_requests_pass() {
    assert!(validate_request(&request(PaymentInput::Card(card()))).is_ok());
    assert!(validate_request(&request(PaymentInput::Nequi {
      phone_number: "3107654321".into()
    }))
    .is_ok());
    assert!(validate_request(&request(PaymentInput::Pse(PseDetails {
      user_type: 0,
      user_legal_id_type: "CC".into(),
      user_legal_id: "1099888777".into(),
      financial_institution_code: "1022".into(),
    })))
    .is_ok());
  }

  #[test]
  fn method_specific_fields_are_checked() {
    let mut bad_card = card();
    bad_card.exp_month = "13".into();
    assert!(validate_request(&request(PaymentInput::Card(bad_card))).is_err());

    assert!(validate_request(&request(PaymentInput::Nequi {
      phone_number: "310765".into()
    }))
    .is_err());

    assert!(validate_request(&request(PaymentInput::Pse(PseDetails {
      user_type: 0,
      user_legal_id_type: "CC".into(),
      user_legal_id: "1099888777".into(),
      financial_institution_code: "0".into(),
    })))
    .is_err());
  }

  #[test]
  fn items_must_be_present_and_positive() {
    let mut req = request(PaymentInput::Card(card()));
    req.items.clear();
    assert!(validate_request(&req).is_err());

    let mut req = request(PaymentInput::Card(card()));
    req.items[0].quantity = 0;
    assert!(validate_request(&req).is_err());
  }

  #[test]
  fn repeated_products_are_merged() {
    let mut req = request(PaymentInput::Card(card()));
    let id = Uuid::new_v4();
    req.items = vec![
      CheckoutItemInput { product_id: id, quantity: 2 },
      CheckoutItemInput { product_id: id, quantity: 3 },
    ];
    assert_eq!(merge_items(&req).unwrap().get(&id), Some(&5));
  }

  #[test]
  fn merged_quantities_are_bounded() {
    let mut req = request(PaymentInput::Card(card()));
    let id = Uuid::new_v4();
    req.items = vec![
      CheckoutItemInput { product_id: id, quantity: i32::MAX },
      CheckoutItemInput { product_id: id, quantity: 1 },
    ];
    assert!(matches!(merge_items(&req), Err(AppError::Validation(_))));
    assert!(matches!(validate_request(&req), Err(AppError::Validation(_))));

    req.items = vec![
      CheckoutItemInput { product_id: id, quantity: MAX_QUANTITY },
      CheckoutItemInput { product_id: Uuid::new_v4(), quantity: MAX_QUANTITY },
    ];
    assert!(validate_request(&req).is_ok());
  }

  #[test]
  fn card_number_with_unicode_spaces_is_safe_to_log() {
    let mut spaced = card();
    spaced.number = "4242424242424242\u{3000}42".into();
    assert!(validate_request(&request(PaymentInput::Card(spaced.clone()))).is_ok());
    assert_eq!(spaced.last_four(), "4242");

    let mut letters = card();
    letters.number = "4242 4242 4242 42x2".into();
    assert!(validate_request(&request(PaymentInput::Card(letters))).is_err());
  }

  #[test]
  fn payment_input_is_tagged_by_method() {
    let input: PaymentInput = serde_json::from_str(r#"{"method":"nequi","phone_number":"3107654321"}"#).unwrap();
    assert_eq!(input.method(), PaymentMethod::Nequi);
    let input: PaymentInput = serde_json::from_str(
      r#"{"method":"card","number":"4242424242424242","cvc":"123","exp_month":"08","exp_year":"29","card_holder":"Ana Perez"}"#,
    )
    .unwrap();
    assert_eq!(input.method(), PaymentMethod::Card);
  }

  #[test]
  fn checkout_steps_are_in_order() {
    assert_eq!(
      checkout_flow().step_names(),
      vec![
        VALIDATE_CHECKOUT_REQUEST,
        UPSERT_CUSTOMER,
        CREATE_ORDER,
        PREPARE_PAYMENT,
        PROCESS_PAYMENT,
        RECONCILE_ORDER
      ]
    );
  }
}
