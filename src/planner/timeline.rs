//! Timeline block aggregation

use rust_decimal::Decimal;

use super::{FixedBudgetPlan, ScheduledGoalBlock};

/// Collapses each goal's consecutive contributions into blocks, sorted by
/// their starting payment. A gap in a goal's payments opens a new block.
pub fn build_blocks(plan: &FixedBudgetPlan) -> Vec<ScheduledGoalBlock> {
    let mut open: Vec<ScheduledGoalBlock> = Vec::new();
    let mut closed: Vec<ScheduledGoalBlock> = Vec::new();

    for payment in &plan.payments {
        for contribution in &payment.contributions {
            if let Some(block) = open
                .iter_mut()
                .find(|block| block.goal_id == contribution.goal_id)
            {
                if block.end_payment + 1 == payment.payment_number {
                    block.end_payment = payment.payment_number;
                    block.end_day = payment.date_day;
                    block.total_amount += contribution.amount;
                    block.payment_count += 1;
                    continue;
                }
                // the goal skipped at least one payment: close the run
                closed.push(block.clone());
                *block = new_block(contribution, payment.payment_number, payment.date_day);
                continue;
            }
            open.push(new_block(contribution, payment.payment_number, payment.date_day));
        }
    }

    closed.extend(open);
    closed.sort_by(|a, b| {
        a.start_payment
            .cmp(&b.start_payment)
            .then(a.goal_id.cmp(&b.goal_id))
    });
    closed
}

fn new_block(
    contribution: &super::PlannedContribution,
    payment_number: u32,
    date_day: i64,
) -> ScheduledGoalBlock {
    ScheduledGoalBlock {
        goal_id: contribution.goal_id,
        goal_name: contribution.goal_name.clone(),
        start_payment: payment_number,
        end_payment: payment_number,
        start_day: date_day,
        end_day: date_day,
        total_amount: contribution.amount,
        payment_count: 1,
    }
}
