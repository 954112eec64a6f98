use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quotecalc::prelude::*;

fn product(n: u32) -> QuoteProduct {
    QuoteProduct {
        fabricante: "Dell".into(),
        part_number: format!("PN-{n}"),
        descricao: "Servidor".into(),
        id_familia_range: String::new(),
        categoria: quotecalc::Categoria::Hw,
        variacao_cambial: false,
        custo_unitario: 1000.0 + f64::from(n),
        preco_venda: 1500.0 + f64::from(n),
        quantidade: 1 + n % 7,
    }
}

/// FC sheet summing the product rows, plus one derived column per row
fn build_template(rows: u32) -> Workbook {
    let mut wb = Workbook::empty();
    wb.add_worksheet_with_name("produtos").unwrap();
    wb.add_worksheet_with_name("rateio").unwrap();
    wb.add_worksheet_with_name("FC").unwrap();

    let quote = Quote {
        number: "BENCH".into(),
        prv: 60,
        products: (0..rows).map(product).collect(),
        services: Vec::new(),
    };
    fill_template(&mut wb, &quote, &TemplateLayout::default()).unwrap();

    let produtos = wb.worksheet_by_name_mut("produtos").unwrap();
    for row in 2..rows + 2 {
        produtos
            .set_cell_formula(&format!("L{row}"), &format!("=K{row}-J{row}"))
            .unwrap();
    }

    let last = rows + 1;
    let fc = wb.worksheet_by_name_mut("FC").unwrap();
    fc.set_cell_formula("C13", &format!("=SUM(produtos!K2:K{last})"))
        .unwrap();
    fc.set_cell_formula("C15", &format!("=SUM(produtos!J2:J{last})"))
        .unwrap();
    fc.set_cell_formula("C19", &format!("=SUM(produtos!L2:L{last})"))
        .unwrap();
    fc.set_cell_formula("B19", "=B13-B15-B16-B18").unwrap();
    fc.set_cell_formula("B8", "=IFERROR(B19/B13,0)").unwrap();
    fc.set_cell_value("DZ19", 0.12).unwrap();
    fc.set_cell_formula("DZ21", "=(1+DZ19)^(DZ20/360)-1").unwrap();
    fc.set_cell_formula("B7", "=NPV(DZ21,-B15-B16,B13-B18)")
        .unwrap();
    wb
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_fc");
    for rows in [10u32, 100, 1_000] {
        let template = build_template(rows);
        group.throughput(Throughput::Elements(u64::from(rows)));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &template, |b, wb| {
            b.iter(|| {
                let mut wb = wb.clone();
                black_box(evaluate_sheet(&mut wb, "FC").unwrap())
            })
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let template = build_template(200);
    let layout = TemplateLayout::default();
    let quote = Quote {
        number: "BENCH".into(),
        prv: 30,
        products: (0..200).map(product).collect(),
        services: Vec::new(),
    };

    c.bench_function("update_cash_flow_200_products", |b| {
        b.iter(|| {
            let mut wb = template.clone();
            black_box(update_cash_flow(&mut wb, &quote, &layout).unwrap())
        })
    });
}

criterion_group!(benches, bench_evaluate, bench_pipeline);
criterion_main!(benches);
