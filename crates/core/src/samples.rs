//! Few-shot sample queries taken from real analyst questions against the warehouse.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SampleQuery {
    pub id: String,
    pub question: String,
    pub sql: String,
    pub explanation: String,
}

impl SampleQuery {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        sql: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            sql: sql.into(),
            explanation: explanation.into(),
        }
    }
}

/// Ordered collection of samples; order is the declaration order and is what
/// sample selection falls back on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SampleLibrary {
    samples: Vec<SampleQuery>,
}

impl SampleLibrary {
    pub fn new(samples: Vec<SampleQuery>) -> Self {
        Self { samples }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleQuery> {
        self.samples.iter()
    }

    pub fn get(&self, id: &str) -> Option<&SampleQuery> {
        self.samples.iter().find(|sample| sample.id == id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub fn sample_library() -> SampleLibrary {
    SampleLibrary::new(vec![
        SampleQuery::new(
            "revolve_orders_aov_by_category",
            "Show me the number of Revolve orders and AOV for United Kingdom between date ranges, split by Category",
            r#"
SELECT
  CASE
    WHEN t1.oorderdate >= '2022-08-25' AND t1.oorderdate < '2023-08-25' THEN '8/25/22 - 8/24/23'
    WHEN t1.oorderdate >= '2021-08-25' AND t1.oorderdate < '2022-08-25' THEN '8/25/21 - 8/24/22'
  END AS period,
  t4.catname2 AS category,
  COUNT(DISTINCT t1.transactionid) AS nOrders,
  AVG(t1.ssales) AS AOV
FROM
  bi_report.shipmentnumber_rs t1
  INNER JOIN mars__revolveclothing_com___db.product t2 ON t1.productcode = UPPER(TRIM(t2.code))
  INNER JOIN mars__id.id_categorynames2 t4 ON SUBSTRING(SPLIT_PART(t2.code, '-', 2), 2, 1) = t4.lettercat
WHERE
  t1.oorderdate >= '2021-08-25'
  AND t1.oorderdate < '2023-08-25'
  AND t1.site <> 'F'
  AND t1.shippingcountry = 'United Kingdom'
GROUP BY 1, 2
ORDER BY 1, 2
"#,
            "Correct approach: Use shipmentnumber_rs for product-level data, site <> 'F' for Revolve orders",
        ),
        SampleQuery::new(
            "high_value_customers_percentile",
            "Get top brands and categories based on projected net sales for top 5% high value customers",
            r#"
WITH high_value_customers AS (
  SELECT
    useremail,
    SUM(netsales) AS total_netsales,
    PERCENT_RANK() OVER (ORDER BY SUM(netsales) DESC) AS percentile_rank
  FROM
    bi_report.ordernumber_rs
  GROUP BY
    useremail
)
SELECT
  p.brandname,
  cn.catname2,
  SUM(sn.projnetsales_shipped) AS total_projnetsales
FROM
  bi_report.shipmentnumber_rs sn
  JOIN high_value_customers hvc ON sn.useremail = hvc.useremail
  JOIN mars__revolveclothing_com___db.product p ON sn.productcode = UPPER(TRIM(p.code))
  JOIN mars__id.id_categorynames2 cn ON SUBSTRING(SPLIT_PART(p.code, '-', 2), 2, 1) = cn.lettercat
WHERE hvc.percentile_rank <= 0.05
GROUP BY p.brandname, cn.catname2
ORDER BY SUM(sn.projnetsales_shipped) DESC
LIMIT 10
"#,
            "Correct approach: Use PERCENT_RANK for top 5% calculation, proper product code mapping",
        ),
        SampleQuery::new(
            "anet_transactions_exclude_applepay",
            "Show number of transactions and average monthly gross sales through ANET excluding ApplePay",
            r#"
SELECT
  EXTRACT(YEAR FROM on.oorderdate) AS year,
  EXTRACT(MONTH FROM on.oorderdate) AS month,
  COUNT(DISTINCT on.transactionid) AS num_transactions,
  AVG(on.ssales) AS avg_gross_sales
FROM
  bi_report.ordernumber_rs on
  INNER JOIN mars__revolveclothing_com___db.orders o ON on.transactionid = o.transactionid
WHERE
  on.paymenttype = 'ANET'
  AND (o.paymenttokenservice IS NULL OR o.paymenttokenservice != 'ApplePay')
GROUP BY 1, 2
ORDER BY 1, 2
"#,
            "Correct approach: Join with orders table to get paymenttokenservice field",
        ),
        SampleQuery::new(
            "shipping_loss_rates",
            "Analyze Ontrac and UPS loss rates by order value with signature requirements",
            r#"
SELECT
  sp.shippingoption,
  s.sigrequired,
  CASE
    WHEN o.amount <= 100 THEN '0-100'
    WHEN o.amount <= 200 THEN '101-200'
    WHEN o.amount <= 300 THEN '201-300'
    WHEN o.amount <= 400 THEN '301-400'
    WHEN o.amount <= 500 THEN '401-500'
    ELSE '501+'
  END AS value_range,
  COUNT(*) AS total_shipments,
  SUM(CASE WHEN s.extrastatus = 'lost package' THEN 1 ELSE 0 END) AS lost_shipments,
  SUM(CASE WHEN s.extrastatus = 'lost package' THEN 1 ELSE 0 END)::FLOAT / COUNT(*) AS loss_rate
FROM
  bi_report.shipmentnumber_rs sn
  JOIN mars__revolveclothing_com___db.orders o ON sn.transactionid = o.transactionid
  JOIN mars__revolveclothing_com___db.shipment s ON sn.shipmentid = s.shipmentid
  JOIN mars__id.shipping_pickuptime sp ON s.shippingoption = sp.shippingoption
WHERE
  sp.shippingoption IN ('Ontrac', 'UPS')
GROUP BY 1, 2, 3
ORDER BY 1, 2, 3
"#,
            "Correct approach: Use 'lost package' status, get accurate shipping info from shipping_pickuptime",
        ),
        SampleQuery::new(
            "random_customer_survey",
            "Get 5K random REVOLVE customers with last transaction in past 12 months",
            r#"
SELECT
  t1.useremail,
  t1.site,
  t1.invoicenum,
  t1.shipcountry,
  t1.ssales
FROM (
  SELECT
    useremail,
    site,
    invoicenum,
    shipcountry,
    ssales,
    ROW_NUMBER() OVER (PARTITION BY useremail ORDER BY oorderdate DESC) AS rn,
    RANDOM() AS rand_num
  FROM
    bi_report.ordernumber_rs
  WHERE
    oorderdate >= (CURRENT_DATE - INTERVAL '12 months')
    AND site = 'R'
) t1
WHERE t1.rn = 1
ORDER BY t1.rand_num
LIMIT 5000
"#,
            "Correct approach: Use RANDOM() function for random sampling, get most recent transaction per customer",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::sample_library;

    #[test]
    fn library_keeps_declaration_order() {
        let library = sample_library();
        let ids = library.iter().map(|sample| sample.id.as_str()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                "revolve_orders_aov_by_category",
                "high_value_customers_percentile",
                "anet_transactions_exclude_applepay",
                "shipping_loss_rates",
                "random_customer_survey",
            ]
        );
    }

    #[test]
    fn every_sample_is_a_select_or_cte() {
        for sample in sample_library().iter() {
            let head = sample.sql.trim_start().to_ascii_uppercase();
            assert!(
                head.starts_with("SELECT") || head.starts_with("WITH"),
                "sample {} should be a read query",
                sample.id
            );
        }
    }

    #[test]
    fn lookup_by_id() {
        let library = sample_library();
        assert!(library.get("shipping_loss_rates").is_some());
        assert!(library.get("missing").is_none());
    }
}
