//! Property tests over the evaluation pass

use crate::common::*;
use proptest::prelude::*;
use quotecalc::prelude::*;

fn amount() -> impl Strategy<Value = f64> {
    (0u32..10_000_000).prop_map(|cents| f64::from(cents) / 100.0)
}

proptest! {
    #[test]
    fn margin_matches_derived_totals(
        revenue in amount(),
        product_cost in amount(),
        allocated_cost in amount(),
        tax_rate in 0.0f64..0.5,
    ) {
        let inputs = CashFlowInputs {
            gross_revenue: revenue,
            prv: 30.0,
            product_cost,
            allocated_cost,
            taxes: revenue * tax_rate,
        };
        let mut wb = fc_template();
        let result = update_cash_flow_with_inputs(
            &mut wb,
            &Quote::default(),
            inputs,
            &TemplateLayout::default(),
        )
        .unwrap();

        prop_assert!((result.margem() - inputs.margin()).abs() < 1e-6);
        prop_assert!((result.margem_percentual() - inputs.margin_percent()).abs() < 1e-6);
        prop_assert_eq!(result.outputs.provenance, Provenance::Evaluated);
    }

    #[test]
    fn unrelated_literal_does_not_change_results(noise in any::<i32>()) {
        let mut wb = fc_template();
        let layout = TemplateLayout::default();
        let baseline = update_cash_flow_with_inputs(
            &mut wb, &Quote::default(), reference_inputs(), &layout,
        )
        .unwrap();

        wb.worksheet_by_name_mut("FC")
            .unwrap()
            .set_cell_value("Z50", f64::from(noise))
            .unwrap();
        let table = evaluate_sheet(&mut wb, "FC").unwrap();
        let again = extract(&table, &layout.outputs);

        prop_assert_eq!(again.values, baseline.outputs.values);
    }

    #[test]
    fn cycles_always_fail(len in 1usize..12) {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("FC").unwrap();
        let ws = wb.worksheet_by_name_mut("FC").unwrap();
        for i in 0..len {
            let next = (i + 1) % len;
            let formula = format!("=A{}+1", next + 1);
            ws.set_cell_formula(&format!("A{}", i + 1), &formula).unwrap();
        }

        match evaluate_sheet(&mut wb, "FC") {
            Err(Error::CyclicDependency { cells }) => prop_assert_eq!(cells.len(), len),
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}
