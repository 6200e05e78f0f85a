use crate::domain::ids::{DepartmentId, OtdelId, RuleId, UserId};
use crate::domain::order::{OrderRoutingContext, OrderRoutingRule};
use crate::domain::org::Actor;

/// Sort key for matching rules; the smallest key wins.
///
/// Column order is OrderType, Otdel, Office, Department, Branch. A set
/// column beats a wildcard at the same position regardless of how many
/// wildcards either rule has overall.
type RulePrecedence = (bool, bool, bool, bool, bool, RuleId);

impl OrderRoutingRule {
    pub fn matches(&self, ctx: &OrderRoutingContext) -> bool {
        column_matches(self.order_type_id, Some(ctx.order_type_id))
            && column_matches(self.department_id, ctx.department_id)
            && column_matches(self.otdel_id, ctx.otdel_id)
            && column_matches(self.branch_id, ctx.branch_id)
            && column_matches(self.office_id, ctx.office_id)
    }

    fn precedence(&self) -> RulePrecedence {
        (
            self.order_type_id.is_none(),
            self.otdel_id.is_none(),
            self.office_id.is_none(),
            self.department_id.is_none(),
            self.branch_id.is_none(),
            self.id,
        )
    }

    /// Whether `holder` sits inside the org scope this rule pins.
    fn admits_holder(&self, holder: &Actor) -> bool {
        self.department_id.map_or(true, |department| holder.department_id == department)
            && unit_admits(self.otdel_id, holder.otdel_id)
            && unit_admits(self.branch_id, holder.branch_id)
            && unit_admits(self.office_id, holder.office_id)
    }
}

fn column_matches<T: PartialEq>(rule_value: Option<T>, ctx_value: Option<T>) -> bool {
    match rule_value {
        None => true,
        Some(value) => ctx_value == Some(value),
    }
}

/// A holder with no unit at a pinned level serves the whole organization.
fn unit_admits<T: PartialEq>(rule_value: Option<T>, holder_value: Option<T>) -> bool {
    match (rule_value, holder_value) {
        (None, _) | (Some(_), None) => true,
        (Some(rule), Some(holder)) => rule == holder,
    }
}

/// Picks the single best rule for `ctx` among `rules`.
pub fn select_rule<'a>(
    rules: &'a [OrderRoutingRule],
    ctx: &OrderRoutingContext,
) -> Option<&'a OrderRoutingRule> {
    rules.iter().filter(|rule| rule.matches(ctx)).min_by_key(|rule| rule.precedence())
}

/// Narrow-to-wide holder choice for a matched rule. The rule's pinned units
/// decide eligibility; ranking compares holders against the order's own
/// department, branch, otdel and office so a holder inside the order's unit
/// beats one elsewhere. Lowest user id breaks the remaining tie.
pub fn select_holder<'a>(
    rule: &OrderRoutingRule,
    ctx: &OrderRoutingContext,
    holders: &'a [Actor],
) -> Option<&'a Actor> {
    holders
        .iter()
        .filter(|holder| rule.admits_holder(holder))
        .min_by_key(|holder| holder_rank(ctx, holder))
}

type HolderRank = (bool, bool, bool, bool, UserId);

fn holder_rank(ctx: &OrderRoutingContext, holder: &Actor) -> HolderRank {
    (
        !exact(ctx.department_id, Some(holder.department_id)),
        !exact(ctx.branch_id, holder.branch_id),
        !exact(ctx.otdel_id, holder.otdel_id),
        !exact(ctx.office_id, holder.office_id),
        holder.id,
    )
}

fn exact<T: PartialEq>(order_value: Option<T>, holder_value: Option<T>) -> bool {
    order_value.is_some() && order_value == holder_value
}

/// Department/otdel a hard rule for an order type pins, if any.
pub(crate) fn predefined_unit(
    rules: &[OrderRoutingRule],
) -> Option<(Option<DepartmentId>, Option<OtdelId>)> {
    rules
        .iter()
        .filter(|rule| rule.order_type_id.is_some())
        .filter(|rule| rule.department_id.is_some() || rule.otdel_id.is_some())
        .min_by_key(|rule| rule.precedence())
        .map(|rule| (rule.department_id, rule.otdel_id))
}
