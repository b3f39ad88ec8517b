use super::{Column, Relationship, Schema, Table};

const ORDERS_SCHEMA: &str = "mars__revolveclothing_com___db";

/// The Revolve/Forward reporting warehouse on Redshift.
pub fn schema() -> Schema {
    Schema::new("revolve_redshift", "bi_report")
        .table(order_numbers())
        .table(shipment_numbers())
        .table(payment_orders())
        .table(products())
        .table(detailed_shipments())
        .table(category_names())
        .table(pickup_times())
        .relationship(Relationship::inner_join(
            "shipment_to_product",
            ["bi_report.shipmentnumber_rs", "mars__revolveclothing_com___db.product"],
            "sn.productcode = UPPER(TRIM(p.code))",
            "Links shipments to product details (productcode matching)",
        ))
        .relationship(Relationship::inner_join(
            "shipment_to_orders",
            ["bi_report.shipmentnumber_rs", "mars__revolveclothing_com___db.orders"],
            "sn.transactionid = o.transactionid",
            "Links shipments to order payment information",
        ))
        .relationship(Relationship::inner_join(
            "shipment_to_detailed_shipment",
            ["bi_report.shipmentnumber_rs", "mars__revolveclothing_com___db.shipment"],
            "sn.shipmentid = s.shipmentid",
            "Links shipment summary to detailed shipment info",
        ))
        .relationship(Relationship::inner_join(
            "product_to_category",
            ["mars__revolveclothing_com___db.product", "mars__id.id_categorynames2"],
            "SUBSTRING(SPLIT_PART(p.code, '-', 2), 2, 1) = cn.lettercat",
            "Maps product codes to category names via letter codes",
        ))
        .relationship(Relationship::inner_join(
            "ordernumber_to_orders",
            ["bi_report.ordernumber_rs", "mars__revolveclothing_com___db.orders"],
            "on.transactionid = o.transactionid",
            "Links order summaries to raw order data for payment info",
        ))
}

fn order_numbers() -> Table {
    Table::new("bi_report.ordernumber_rs", "Order-level data from Revolve/Forward transactions")
        .column(Column::new("useremail", "VARCHAR(256)", "Customer email address"))
        .column(
            Column::new("transactionid", "VARCHAR(256)", "Unique transaction identifier")
                .primary_key(),
        )
        .column(Column::new("site", "VARCHAR(5)", "Site identifier (R=Revolve, F=Forward)"))
        .column(Column::new("shipcountry", "VARCHAR(256)", "Shipping country"))
        .column(Column::new("oorderdate", "TIMESTAMP", "Order date"))
        .column(Column::new("ssales", "DOUBLE PRECISION", "Sales amount"))
        .column(Column::new("netsales", "DOUBLE PRECISION", "Net sales amount"))
        .column(Column::new("invoicenum", "VARCHAR(256)", "Invoice number"))
        .column(Column::new("paymenttype", "VARCHAR(255)", "Payment method (ANET, etc.)"))
        .rule("Revolve orders: site <> 'F' (excludes Forward)")
        .rule("Does NOT contain product-level information")
        .rule("Contains payment information but not paymenttokenservice")
}

fn shipment_numbers() -> Table {
    Table::new("bi_report.shipmentnumber_rs", "Shipment-level data with product information")
        .column(Column::new("useremail", "VARCHAR(256)", "Customer email address"))
        .column(
            Column::new("transactionid", "VARCHAR(256)", "Transaction identifier")
                .references("bi_report.ordernumber_rs.transactionid"),
        )
        .column(
            Column::new("shipmentid", "VARCHAR(256)", "Unique shipment identifier").primary_key(),
        )
        .column(Column::new("site", "VARCHAR(256)", "Site identifier"))
        .column(Column::new("oorderdate", "TIMESTAMP", "Original order date"))
        .column(Column::new("shipmentdate", "TIMESTAMP", "Shipment date"))
        .column(Column::new("amount", "DOUBLE PRECISION", "Shipment amount"))
        .column(Column::new("ssales", "REAL", "Shipment sales"))
        .column(Column::new("netsales", "REAL", "Net sales from shipment"))
        .column(
            Column::new("productcode", "VARCHAR(256)", "Product code")
                .references("mars__revolveclothing_com___db.product.code"),
        )
        .column(Column::new(
            "projnetsales_shipped",
            "REAL",
            "Projected net sales for shipped items",
        ))
        .column(Column::new("extrastatus", "VARCHAR(256)", "Extra status including 'lost package'"))
        .column(Column::new("shippingcountry", "VARCHAR(256)", "Shipping country"))
        .rule("Contains product codes for joining with product tables")
        .rule("Has projected sales calculations")
        .rule("extrastatus contains 'lost package' not 'lost'")
        .rule("Links to mars__revolveclothing_com___db.orders for additional data")
}

fn payment_orders() -> Table {
    let description = "Raw orders table with payment token information";
    Table::new(format!("{ORDERS_SCHEMA}.orders"), description)
        .column(Column::new("transactionid", "VARCHAR", "Transaction identifier for joining"))
        .column(Column::new(
            "paymenttokenservice",
            "VARCHAR",
            "Payment token service (ApplePay, etc.)",
        ))
        .column(Column::new("amount", "DECIMAL", "Order amount"))
}

fn products() -> Table {
    let code = "Product code (matches shipmentnumber_rs.productcode)";
    Table::new(format!("{ORDERS_SCHEMA}.product"), "Product information table")
        .column(Column::new("code", "VARCHAR", code).primary_key())
        .column(Column::new("brandname", "VARCHAR", "Brand name"))
}

fn detailed_shipments() -> Table {
    Table::new(format!("{ORDERS_SCHEMA}.shipment"), "Detailed shipment information")
        .column(Column::new("shipmentid", "VARCHAR", "Shipment identifier").primary_key())
        .column(Column::new("extrastatus", "VARCHAR", "Extra status with 'lost package'"))
        .column(Column::new("shippingoption", "VARCHAR", "Shipping carrier"))
        .column(Column::new("sigrequired", "BOOLEAN", "Signature required flag"))
}

fn category_names() -> Table {
    Table::new("mars__id.id_categorynames2", "Category mapping table")
        .column(Column::new("lettercat", "VARCHAR(1)", "Category letter code").primary_key())
        .column(Column::new("catname2", "VARCHAR", "Category name"))
}

fn pickup_times() -> Table {
    Table::new("mars__id.shipping_pickuptime", "Shipping carrier information")
        .column(Column::new("shippingoption", "VARCHAR", "More accurate shipping carrier info"))
}
