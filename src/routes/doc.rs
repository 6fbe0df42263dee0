use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        account::{AddressList, BillingInfoDto, BillingList, NewAddressRequest, NewBillingRequest, UpdateProfileRequest},
        admin::{CustomerList, ImportReport, ImportRowError, ReconciliationReport, ReconciliationRow, ResetPasswordRequest, UpdateOrderRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartView, ProductSnapshot, SetQuantityRequest},
        orders::{CheckoutReceipt, CheckoutRequest, OrderList, OrderWithItems},
        products::{CategoryList, CreateCategoryRequest, CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Address, Admin, CartItem, Category, Customer, Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    routes::{account, admin, auth, cart, health, orders, params, products as product_routes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::list_categories,
        cart::cart_view,
        cart::add_to_cart,
        cart::set_quantity,
        cart::remove_item,
        orders::list_orders,
        orders::checkout,
        orders::order_stream,
        orders::get_order,
        account::get_profile,
        account::update_profile,
        account::list_addresses,
        account::create_address,
        account::delete_address,
        account::set_default_address,
        account::list_billing,
        account::create_billing,
        admin::register,
        admin::login,
        admin::create_product,
        admin::import_products,
        admin::update_product,
        admin::delete_product,
        admin::create_category,
        admin::delete_category,
        admin::list_orders,
        admin::export_orders,
        admin::reconcile_orders,
        admin::order_stream,
        admin::get_order,
        admin::update_order,
        admin::list_customers,
        admin::reset_password
    ),
    components(
        schemas(
            Customer,
            Admin,
            Category,
            Product,
            CartItem,
            Order,
            OrderItem,
            Address,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            SetQuantityRequest,
            CartItemDto,
            ProductSnapshot,
            CartView,
            CheckoutRequest,
            CheckoutReceipt,
            OrderWithItems,
            OrderList,
            UpdateProfileRequest,
            NewAddressRequest,
            NewBillingRequest,
            AddressList,
            BillingInfoDto,
            BillingList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateCategoryRequest,
            CategoryList,
            UpdateOrderRequest,
            ResetPasswordRequest,
            CustomerList,
            ImportRowError,
            ImportReport,
            ReconciliationRow,
            ReconciliationReport,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<CheckoutReceipt>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CustomerList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Customer authentication"),
        (name = "Catalog", description = "Public products and categories"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout, order history, and the live feed"),
        (name = "Account", description = "Profile, addresses, and billing"),
        (name = "Admin", description = "Store management endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
