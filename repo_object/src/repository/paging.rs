//! Paging and sorting capability

use crate::errors::RepositoryError;
use crate::query_builder::{
    OrderKey, PaginationRequest, QueryBuilder, QueryDescriptor, QueryFilter, SortDirection,
};
use crate::repository::crud::CrudRepository;
use crate::repository::PagingRepository;
use crate::traits::{Entity, TableHandle};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Bulk reads composed by the `QueryBuilder`, materialized eagerly.
///
/// `track` decides whether results are attached to the connection handle's
/// change tracker; the conventional value is `false`.
#[async_trait]
pub trait PagingAndSortingRepository<E: Entity>: CrudRepository<E> {
    /// Run one composed bulk read
    fn find_all_by(&self, descriptor: &QueryDescriptor) -> Result<Vec<E>, RepositoryError>;

    async fn find_all_by_async(
        &self,
        descriptor: &QueryDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError>;

    /// Every entity, in store order
    fn find_all(&self, track: bool) -> Result<Vec<E>, RepositoryError> {
        self.find_all_by(&QueryDescriptor::new().track(track))
    }

    async fn find_all_async(
        &self,
        track: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError> {
        let descriptor = QueryDescriptor::new().track(track);
        self.find_all_by_async(&descriptor, cancel).await
    }

    fn find_all_paged(
        &self,
        page: PaginationRequest,
        track: bool,
    ) -> Result<Vec<E>, RepositoryError> {
        self.find_all_by(&QueryDescriptor::new().page(page).track(track))
    }

    async fn find_all_paged_async(
        &self,
        page: PaginationRequest,
        track: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError> {
        let descriptor = QueryDescriptor::new().page(page).track(track);
        self.find_all_by_async(&descriptor, cancel).await
    }

    fn find_all_paged_where(
        &self,
        page: PaginationRequest,
        predicate: &QueryFilter,
        track: bool,
    ) -> Result<Vec<E>, RepositoryError> {
        self.find_all_by(
            &QueryDescriptor::new()
                .filter(predicate.clone())
                .page(page)
                .track(track),
        )
    }

    async fn find_all_paged_where_async(
        &self,
        page: PaginationRequest,
        predicate: &QueryFilter,
        track: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError> {
        let descriptor = QueryDescriptor::new()
            .filter(predicate.clone())
            .page(page)
            .track(track);
        self.find_all_by_async(&descriptor, cancel).await
    }

    fn find_all_paged_sorted(
        &self,
        page: PaginationRequest,
        order: &OrderKey,
        direction: SortDirection,
        track: bool,
    ) -> Result<Vec<E>, RepositoryError> {
        self.find_all_by(
            &QueryDescriptor::new()
                .order_by(order.clone(), direction)
                .page(page)
                .track(track),
        )
    }

    async fn find_all_paged_sorted_async(
        &self,
        page: PaginationRequest,
        order: &OrderKey,
        direction: SortDirection,
        track: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError> {
        let descriptor = QueryDescriptor::new()
            .order_by(order.clone(), direction)
            .page(page)
            .track(track);
        self.find_all_by_async(&descriptor, cancel).await
    }

    fn find_all_paged_where_sorted(
        &self,
        page: PaginationRequest,
        predicate: &QueryFilter,
        order: &OrderKey,
        direction: SortDirection,
        track: bool,
    ) -> Result<Vec<E>, RepositoryError> {
        self.find_all_by(
            &QueryDescriptor::new()
                .filter(predicate.clone())
                .order_by(order.clone(), direction)
                .page(page)
                .track(track),
        )
    }

    async fn find_all_paged_where_sorted_async(
        &self,
        page: PaginationRequest,
        predicate: &QueryFilter,
        order: &OrderKey,
        direction: SortDirection,
        track: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryError> {
        let descriptor = QueryDescriptor::new()
            .filter(predicate.clone())
            .order_by(order.clone(), direction)
            .page(page)
            .track(track);
        self.find_all_by_async(&descriptor, cancel).await
    }
}

#[async_trait]
impl<R> PagingAndSortingRepository<R::Entity> for R
where
    R: PagingRepository,
{
    fn find_all_by(
        &self,
        descriptor: &QueryDescriptor,
    ) -> Result<Vec<R::Entity>, RepositoryError> {
        let table = self.table();
        let query = QueryBuilder::build::<R::Entity, _>(&table, descriptor)?;
        Ok(table.to_list(&query)?)
    }

    async fn find_all_by_async(
        &self,
        descriptor: &QueryDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Vec<R::Entity>, RepositoryError> {
        if cancel.is_cancelled() {
            return Err(RepositoryError::OperationCancelled);
        }
        let table = self.table();
        let query = QueryBuilder::build::<R::Entity, _>(&table, descriptor)?;
        Ok(table.to_list_async(&query, cancel).await?)
    }
}
