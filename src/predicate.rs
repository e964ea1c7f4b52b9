//! Predicate Translator
//!
//! Maps abstract filters onto the record store's native
//! `[column, operator, value]` triples (an Odoo "domain").

use serde::Serialize;

use crate::action::{FilterDescriptor, FilterOperator, ScalarValue};
use crate::odoo::xmlrpc::Value as RpcValue;

/// A single native filter condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativePredicate {
    pub column: String,
    pub op: &'static str,
    pub value: ScalarValue,
}

impl NativePredicate {
    /// Encode as the XML-RPC `[column, op, value]` array
    pub fn to_rpc(&self) -> RpcValue {
        RpcValue::Array(vec![
            RpcValue::String(self.column.clone()),
            RpcValue::String(self.op.to_string()),
            scalar_to_rpc(&self.value),
        ])
    }
}

/// Native operator symbol for each abstract operator.
///
/// Odoo's `ilike` already wraps the operand in `%...%`, so it is the
/// case-insensitive "contains" the model asks for.
pub fn op_symbol(op: FilterOperator) -> &'static str {
    match op {
        FilterOperator::Eq => "=",
        FilterOperator::Ilike => "ilike",
        FilterOperator::Gt => ">",
        FilterOperator::Lt => "<",
        FilterOperator::Gte => ">=",
        FilterOperator::Lte => "<=",
    }
}

/// One predicate per filter, in order. An empty list means "no restriction".
pub fn translate(filters: &[FilterDescriptor]) -> Vec<NativePredicate> {
    filters
        .iter()
        .map(|f| NativePredicate {
            column: f.column.clone(),
            op: op_symbol(f.operator),
            value: f.value.clone(),
        })
        .collect()
}

/// Encode a predicate list as an Odoo domain
pub fn to_domain(predicates: &[NativePredicate]) -> RpcValue {
    RpcValue::Array(predicates.iter().map(NativePredicate::to_rpc).collect())
}

fn scalar_to_rpc(value: &ScalarValue) -> RpcValue {
    match value {
        ScalarValue::Bool(b) => RpcValue::Bool(*b),
        ScalarValue::Integer(i) => RpcValue::Int(*i),
        ScalarValue::Float(f) => RpcValue::Double(*f),
        ScalarValue::Text(s) => RpcValue::String(s.clone()),
    }
}
