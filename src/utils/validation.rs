//! Validation utilities

use bigdecimal::{BigDecimal, ToPrimitive};

use crate::traits::*;
use crate::types::*;

/// Largest supported minor-unit scale
pub const MAX_MINOR_UNIT_SCALE: u32 = 6;

/// Convert an amount into integer minor units at the given scale.
///
/// Amounts finer than one minor unit are rejected rather than rounded.
pub fn to_minor_units(amount: &BigDecimal, scale: u32) -> Result<i64, String> {
    if scale > MAX_MINOR_UNIT_SCALE {
        return Err(format!("minor unit scale {} is not supported", scale));
    }
    let factor = BigDecimal::from(10_i64.pow(scale));
    let scaled = amount * &factor;
    if !scaled.is_integer() {
        return Err(format!(
            "amount {} has more than {} decimal places",
            amount, scale
        ));
    }
    scaled
        .to_i64()
        .ok_or_else(|| format!("amount {} is out of range", amount))
}

/// Validate that an amount is zero or positive and representable in minor units
pub fn validate_non_negative_amount(
    field: &str,
    amount: &BigDecimal,
    scale: u32,
) -> LedgerResult<()> {
    let units =
        to_minor_units(amount, scale).map_err(|message| LedgerError::validation(field, message))?;
    if units < 0 {
        return Err(LedgerError::validation(field, "amount cannot be negative"));
    }
    Ok(())
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::validation("code", "account code cannot be empty"));
    }

    if code.len() > 20 {
        return Err(LedgerError::validation(
            "code",
            "account code cannot exceed 20 characters",
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LedgerError::validation(
            "code",
            "account code can only contain letters, digits, dashes, and dots",
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("name", "account name cannot be empty"));
    }

    if name.len() > 100 {
        return Err(LedgerError::validation(
            "name",
            "account name cannot exceed 100 characters",
        ));
    }

    Ok(())
}

/// Validate that a transaction description is valid
pub fn validate_transaction_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::validation(
            "description",
            "transaction description cannot be empty",
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::validation(
            "description",
            "transaction description cannot exceed 500 characters",
        ));
    }

    Ok(())
}

/// Stricter transaction validator: also checks the description and rejects an
/// account appearing twice on the same side.
pub struct EnhancedTransactionValidator {
    pub minor_unit_scale: u32,
}

impl TransactionValidator for EnhancedTransactionValidator {
    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()> {
        transaction.validate(self.minor_unit_scale)?;
        validate_transaction_description(&transaction.description)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &transaction.entries {
            if !seen.insert((&entry.account_code, entry.entry_type())) {
                return Err(LedgerError::validation(
                    "lines",
                    format!(
                        "account '{}' appears multiple times on the same side",
                        entry.account_code
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Stricter account validator enforcing code and name formats
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)
    }
}
