// storefront/src/models/category.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
  pub name: String,
  pub description: Option<String>,
}

impl CategoryInput {
  /// Trims the fields and returns `(name, slug, description)`.
  pub fn normalized(&self) -> Result<(String, String, Option<String>)> {
    let name = self.name.trim().to_string();
    if name.is_empty() {
      return Err(AppError::Validation("Category name cannot be empty.".to_string()));
    }
    if name.chars().count() > 120 {
      return Err(AppError::Validation("Category name is too long (max 120).".to_string()));
    }
    let slug = slugify(&name);
    if slug.is_empty() {
      return Err(AppError::Validation(
        "Category name must contain at least one letter or digit.".to_string(),
      ));
    }
    let description = self
      .description
      .as_deref()
      .map(str::trim)
      .filter(|d| !d.is_empty())
      .map(String::from);
    Ok((name, slug, description))
  }
}

/// Lower-case ASCII slug; every run of other characters becomes a single `-`.
/// Accented Latin letters fold to their base letter.
pub fn slugify(input: &str) -> String {
  let mut slug = String::with_capacity(input.len());
  let mut pending_dash = false;
  for ch in input.chars() {
    let folded = fold_accent(ch.to_ascii_lowercase());
    if folded.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(folded.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  slug
}

fn fold_accent(ch: char) -> char {
  match ch {
    'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
    'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
    'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
    'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
    'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
    'ñ' | 'Ñ' => 'n',
    'ç' | 'Ç' => 'c',
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_collapses_separators_and_folds_accents() {
    assert_eq!(slugify("Café & Té  Orgánico"), "cafe-te-organico");
    assert_eq!(slugify("  --Niños--  "), "ninos");
    assert_eq!(slugify("4K TVs"), "4k-tvs");
    assert_eq!(slugify("!!!"), "");
  }

  #[test]
  fn input_is_trimmed_and_validated() {
    let input = CategoryInput {
      name: "  Hogar  ".into(),
      description: Some("   ".into()),
    };
    let (name, slug, description) = input.normalized().unwrap();
    assert_eq!(name, "Hogar");
    assert_eq!(slug, "hogar");
    assert_eq!(description, None);

    let empty = CategoryInput {
      name: "   ".into(),
      description: None,
    };
    assert!(matches!(empty.normalized(), Err(AppError::Validation(_))));
  }
}
