//! Sample CLR types shared by the unit tests

use crate::builders::ModelBuilder;
use keystone_core::{ClrClass, ClrType, TypeRegistry};

pub(crate) const ORDER: &str = "Order";
pub(crate) const SPECIAL_ORDER: &str = "SpecialOrder";
pub(crate) const BACK_ORDER: &str = "BackOrder";
pub(crate) const CUSTOMER: &str = "Customer";
pub(crate) const SPECIAL_CUSTOMER: &str = "SpecialCustomer";

pub(crate) fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_class(
            ClrClass::new(ORDER)
                .scalar("Id", ClrType::Int32)
                .scalar("CustomerId", ClrType::Int32)
                .scalar("CustomerUnique", ClrType::nullable(ClrType::Guid))
                .reference("Customer", CUSTOMER),
        )
        .with_class(ClrClass::new(SPECIAL_ORDER).with_base(ORDER))
        .with_class(ClrClass::new(BACK_ORDER).with_base(ORDER))
        .with_class(
            ClrClass::new(CUSTOMER)
                .scalar("Id", ClrType::Int32)
                .scalar("Unique", ClrType::Guid)
                .scalar("Name", ClrType::String)
                .collection("Orders", ORDER)
                .collection("SpecialOrders", SPECIAL_ORDER)
                .reference("AmbiguousOrder", SPECIAL_ORDER)
                .reference("NotCollectionOrders", ORDER),
        )
        .with_class(ClrClass::new(SPECIAL_CUSTOMER).with_base(CUSTOMER))
}

pub(crate) fn model_builder() -> ModelBuilder {
    ModelBuilder::new(registry())
}
