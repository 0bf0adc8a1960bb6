use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_core::{DomainError, DomainResult, Page, UserId};
use forgeshop_orders::{OrderFilter, OrderStatus};
use forgeshop_products::ProductId;
use forgeshop_reviews::{check_eligibility, RatingSummary, Review, ReviewDraft, ReviewEligibility, ReviewId};

use crate::config::CommerceConfig;
use crate::store::{OrderStore, ReviewStore};

/// Reviews gated on delivered purchases.
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    orders: Arc<dyn OrderStore>,
    config: CommerceConfig,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        orders: Arc<dyn OrderStore>,
        config: CommerceConfig,
    ) -> Self {
        Self {
            reviews,
            orders,
            config,
        }
    }

    /// Whether `user_id` has a delivered order containing `product_id`.
    pub async fn check_eligibility(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> DomainResult<ReviewEligibility> {
        let filter = OrderFilter::for_customer(user_id)
            .with_product(product_id)
            .with_status(OrderStatus::Delivered);
        let request = self.config.page(Some(1), Some(self.config.max_page_size))?;
        let delivered = self.orders.list(&filter, request).await?;
        Ok(check_eligibility(delivered.items.iter(), user_id, product_id))
    }

    #[instrument(
        skip(self, draft),
        fields(user_id = %draft.user_id, product_id = %draft.product_id, order_id = %draft.order_id),
        err
    )]
    pub async fn create(&self, draft: ReviewDraft) -> DomainResult<Review> {
        draft.validate()?;
        let order = self
            .orders
            .get(draft.order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {}", draft.order_id)))?;

        if self
            .reviews
            .find_by_triple(draft.user_id, draft.product_id, draft.order_id)
            .await?
            .is_some()
        {
            return Err(DomainError::conflict("this purchase has already been reviewed"));
        }

        let review = Review::create(ReviewId::generate(), draft, &order, Utc::now())?;
        self.reviews.insert(review.clone()).await?;
        tracing::info!(review_id = %review.id, rating = review.rating, "review created");
        Ok(review)
    }

    /// Reviews of a product, newest first.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DomainResult<Page<Review>> {
        let request = self.config.page(page, limit)?;
        self.reviews.list_for_product(product_id, request).await
    }

    pub async fn rating_summary(&self, product_id: ProductId) -> DomainResult<RatingSummary> {
        self.reviews.rating_summary(product_id).await
    }
}
