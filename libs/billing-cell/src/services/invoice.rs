use crate::models::{Bill, BillDetail, STATUS_RECALC};

pub const DISCOUNT_THRESHOLD: f64 = 500.0;
pub const DISCOUNT_FACTOR: f64 = 0.9;

/// Sum of line totals, discounted by 10% when strictly above the threshold.
pub fn calculate_total(details: &[BillDetail]) -> f64 {
    let sum: f64 = details.iter().map(|d| d.line_total).sum();
    if sum > DISCOUNT_THRESHOLD {
        sum * DISCOUNT_FACTOR
    } else {
        sum
    }
}

/// Text stored in the bill file. The integrity hash covers these exact bytes.
pub fn render_bill(bill: &Bill) -> String {
    let mut text = format!(
        "Bill Number: {}\nPatient: {}\nDoctor: {}\n",
        bill.bill_number, bill.patient_id, bill.doctor_id
    );
    for detail in &bill.bill_details {
        text.push_str(&format!("{}: ${:.2}\n", detail.treatment_name, detail.line_total));
    }
    text.push_str(&format!("Total: ${:.2}\n\n", bill.total_amount));
    text
}

/// Applies a new unit price to matching lines. Returns whether anything changed.
pub fn reprice_bill(bill: &mut Bill, treatment: &str, unit_price: f64) -> bool {
    let mut touched = false;
    for detail in bill.bill_details.iter_mut().filter(|d| d.treatment_name == treatment) {
        detail.reprice(unit_price);
        touched = true;
    }

    if touched {
        bill.total_amount = calculate_total(&bill.bill_details);
        bill.status = STATUS_RECALC.to_string();
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_PENDING;
    use chrono::Utc;
    use uuid::Uuid;

    fn details(amounts: &[f64]) -> Vec<BillDetail> {
        let bill_id = Uuid::new_v4();
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| BillDetail::new(bill_id, format!("ACT{}", i), 1, *a))
            .collect()
    }

    fn bill(details: Vec<BillDetail>) -> Bill {
        Bill {
            id: Uuid::nil(),
            bill_number: "BILL1700000000000".into(),
            patient_id: Uuid::nil(),
            doctor_id: Uuid::nil(),
            bill_date: Utc::now(),
            total_amount: calculate_total(&details),
            status: STATUS_PENDING.into(),
            integrity_hash: None,
            integrity_salt: None,
            bill_details: details,
        }
    }

    #[test]
    fn discount_applies_strictly_above_threshold() {
        assert_eq!(calculate_total(&details(&[500.0])), 500.0);
        assert!((calculate_total(&details(&[500.01])) - 450.009).abs() < 1e-9);
        assert!((calculate_total(&details(&[250.0, 350.0])) - 540.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bill_totals_zero() {
        assert_eq!(calculate_total(&[]), 0.0);
    }

    #[test]
    fn quantities_multiply_unit_price() {
        let lines = vec![BillDetail::new(Uuid::nil(), "XRAY".into(), 2, 100.0)];
        assert_eq!(calculate_total(&lines), 200.0);
    }

    #[test]
    fn rendered_text_is_byte_exact() {
        let bill = bill(vec![
            BillDetail::new(Uuid::nil(), "CONSULTATION".into(), 1, 50.0),
            BillDetail::new(Uuid::nil(), "PRESCRIPTION_RX1".into(), 1, 12.345),
        ]);

        let expected = format!(
            "Bill Number: BILL1700000000000\nPatient: {nil}\nDoctor: {nil}\n\
             CONSULTATION: $50.00\nPRESCRIPTION_RX1: $12.35\nTotal: $62.35\n\n",
            nil = Uuid::nil()
        );
        assert_eq!(render_bill(&bill), expected);
    }

    #[test]
    fn printed_lines_add_up_to_printed_total() {
        let bill = bill(vec![
            BillDetail::new(Uuid::nil(), "PRESCRIPTION_RX2".into(), 3, 0.335),
            BillDetail::new(Uuid::nil(), "PRESCRIPTION_RX3".into(), 1, 0.005),
        ]);

        assert_eq!(bill.bill_details[0].line_total, 1.01);
        assert_eq!(bill.bill_details[1].line_total, 0.01);
        assert!(render_bill(&bill).ends_with("PRESCRIPTION_RX2: $1.01\nPRESCRIPTION_RX3: $0.01\nTotal: $1.02\n\n"));
    }

    #[test]
    fn reprice_marks_bill_for_recalculation() {
        let mut bill = bill(vec![
            BillDetail::new(Uuid::nil(), "XRAY".into(), 1, 100.0),
            BillDetail::new(Uuid::nil(), "CONSULTATION".into(), 1, 50.0),
        ]);

        assert!(reprice_bill(&mut bill, "XRAY", 500.0));
        assert!((bill.total_amount - 495.0).abs() < 1e-9);
        assert_eq!(bill.status, STATUS_RECALC);

        let mut untouched = bill.clone();
        untouched.status = STATUS_PENDING.into();
        assert!(!reprice_bill(&mut untouched, "MRI", 900.0));
        assert_eq!(untouched.status, STATUS_PENDING);
    }
}
