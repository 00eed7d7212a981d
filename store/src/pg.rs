//! Postgres implementation of [`Store`] on top of sea-orm.

use crate::{
    AdvisoryCveInfo, AdvisoryData, AdvisoryFilters, AdvisoryRpmInfo, BuildArtifact, Error,
    NewAdvisory, Store, StoreTx,
};
use errata_common::db::Database;
use errata_entity::{
    advisory, advisory_cve, advisory_fix, advisory_reference, advisory_rpm, affected_product,
    affected_product::AffectedProductState, build_reference, cve, fix, ignored_upstream_package,
    mirror_state, product, reboot_suggested_package, short_code, short_code::ShortCodeMode,
    task_status,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use time::OffsetDateTime;

/// [`Store`] over a sea-orm connection. `C` is either a [`Database`] or a
/// [`DatabaseTransaction`]; the latter doubles as the [`StoreTx`] handle.
pub struct PgStore<C = Database> {
    conn: C,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { conn: db }
    }
}

#[async_trait::async_trait]
impl<C> Store for PgStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn all_short_codes(&self) -> Result<Vec<short_code::Model>, Error> {
        Ok(short_code::Entity::find().all(&self.conn).await?)
    }

    async fn short_code_by_code(&self, code: &str) -> Result<Option<short_code::Model>, Error> {
        Ok(short_code::Entity::find_by_id(code).one(&self.conn).await?)
    }

    async fn create_short_code(
        &self,
        code: &str,
        mode: ShortCodeMode,
    ) -> Result<short_code::Model, Error> {
        let model = short_code::ActiveModel {
            code: Set(code.to_string()),
            mode: Set(mode),
            created_at: Set(OffsetDateTime::now_utc()),
            archived_at: Set(None),
        };
        Ok(short_code::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?)
    }

    async fn products_by_short_code(&self, code: &str) -> Result<Vec<product::Model>, Error> {
        Ok(product::Entity::find()
            .filter(product::Column::ShortCodeCode.eq(code))
            .order_by_asc(product::Column::Id)
            .all(&self.conn)
            .await?)
    }

    async fn product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<Option<product::Model>, Error> {
        Ok(product::Entity::find()
            .filter(product::Column::Name.eq(name))
            .filter(product::Column::ShortCodeCode.eq(code))
            .one(&self.conn)
            .await?)
    }

    async fn product_by_id(&self, id: i64) -> Result<Option<product::Model>, Error> {
        Ok(product::Entity::find_by_id(id).one(&self.conn).await?)
    }

    async fn cve_by_id(&self, id: &str) -> Result<Option<cve::Model>, Error> {
        Ok(cve::Entity::find_by_id(id).one(&self.conn).await?)
    }

    async fn all_cves(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(cve::Entity::find().all(&self.conn).await?)
    }

    async fn unresolved_cves(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(cve::Entity::find()
            .join(
                JoinType::LeftJoin,
                cve::Relation::AffectedProducts.def(),
            )
            .filter(
                Condition::any()
                    .add(affected_product::Column::State.is_null())
                    .add(affected_product::Column::State.is_in([
                        AffectedProductState::UnderInvestigationUpstream,
                        AffectedProductState::UnderInvestigationDownstream,
                        AffectedProductState::AffectedUpstream,
                        AffectedProductState::AffectedDownstream,
                    ])),
            )
            .distinct()
            .all(&self.conn)
            .await?)
    }

    async fn cves_fixed_downstream(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(cve::Entity::find()
            .join(
                JoinType::InnerJoin,
                cve::Relation::AffectedProducts.def(),
            )
            .filter(affected_product::Column::State.eq(AffectedProductState::FixedDownstream))
            .distinct()
            .all(&self.conn)
            .await?)
    }

    async fn create_cve(
        &self,
        id: &str,
        short_code: &str,
        source_by: Option<&str>,
        source_link: Option<&str>,
        content: Option<serde_json::Value>,
    ) -> Result<cve::Model, Error> {
        let model = cve::ActiveModel {
            id: Set(id.to_string()),
            created_at: Set(OffsetDateTime::now_utc()),
            short_code_code: Set(short_code.to_string()),
            source_by: Set(source_by.map(|s| s.to_string())),
            source_link: Set(source_link.map(|s| s.to_string())),
            content: Set(content),
        };
        Ok(cve::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?)
    }

    async fn set_cve_content(&self, id: &str, content: serde_json::Value) -> Result<(), Error> {
        cve::Entity::update_many()
            .col_expr(cve::Column::Content, Expr::value(content))
            .filter(cve::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn affected_products_by_cve(
        &self,
        cve: &str,
    ) -> Result<Vec<affected_product::Model>, Error> {
        Ok(affected_product::Entity::find()
            .filter(affected_product::Column::CveId.eq(cve))
            .order_by_asc(affected_product::Column::Id)
            .all(&self.conn)
            .await?)
    }

    async fn affected_product_by_cve_and_package(
        &self,
        cve: &str,
        package: &str,
    ) -> Result<Option<affected_product::Model>, Error> {
        Ok(affected_product::Entity::find()
            .filter(affected_product::Column::CveId.eq(cve))
            .filter(affected_product::Column::Package.eq(package))
            .one(&self.conn)
            .await?)
    }

    async fn affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<Option<affected_product::Model>, Error> {
        Ok(affected_product::Entity::find()
            .filter(affected_product::Column::Advisory.eq(advisory))
            .one(&self.conn)
            .await?)
    }

    async fn pending_affected_products(&self) -> Result<Vec<affected_product::Model>, Error> {
        Ok(affected_product::Entity::find()
            .filter(affected_product::Column::State.eq(AffectedProductState::FixedUpstream))
            .order_by_asc(affected_product::Column::Id)
            .all(&self.conn)
            .await?)
    }

    async fn create_affected_product(
        &self,
        product_id: i64,
        cve_id: &str,
        state: AffectedProductState,
        version: &str,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<affected_product::Model, Error> {
        let model = affected_product::ActiveModel {
            id: NotSet,
            product_id: Set(product_id),
            cve_id: Set(Some(cve_id.to_string())),
            state: Set(state),
            version: Set(version.to_string()),
            package: Set(package.to_string()),
            advisory: Set(advisory.map(|s| s.to_string())),
        };
        Ok(affected_product::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?)
    }

    async fn update_affected_product(
        &self,
        id: i64,
        state: AffectedProductState,
        package: &str,
        advisory: Option<&str>,
    ) -> Result<(), Error> {
        affected_product::Entity::update_many()
            .col_expr(affected_product::Column::State, Expr::value(state))
            .col_expr(affected_product::Column::Package, Expr::value(package))
            .col_expr(
                affected_product::Column::Advisory,
                Expr::value(advisory.map(|s| s.to_string())),
            )
            .filter(affected_product::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn delete_affected_product(&self, id: i64) -> Result<(), Error> {
        affected_product::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn list_advisories(
        &self,
        filters: &AdvisoryFilters,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<AdvisoryData>, u64), Error> {
        let mut query = advisory::Entity::find();

        if !filters.include_unpublished {
            query = query.filter(advisory::Column::PublishedAt.is_not_null());
        }
        if let Some(before) = filters.before {
            query = query.filter(advisory::Column::PublishedAt.lt(before));
        }
        if let Some(after) = filters.after {
            query = query.filter(advisory::Column::PublishedAt.gt(after));
        }
        if let Some(severity) = filters.severity {
            query = query.filter(advisory::Column::Severity.eq(severity));
        }
        if let Some(kind) = filters.kind {
            query = query.filter(advisory::Column::Kind.eq(kind));
        }

        let rows = query
            .order_by_desc(advisory::Column::PublishedAt)
            .all(&self.conn)
            .await?;

        let mut matched = Vec::new();
        for row in rows {
            let data = assemble(&self.conn, row, filters.include_rpms).await?;
            if crate::matches_filters(&data, filters) {
                matched.push(data);
            }
        }

        let total = matched.len() as u64;
        let items = crate::paginate(matched, page, limit);

        Ok((items, total))
    }

    async fn advisory_by_code_year_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<Option<AdvisoryData>, Error> {
        let row = advisory::Entity::find()
            .filter(advisory::Column::ShortCodeCode.eq(code))
            .filter(advisory::Column::Year.eq(year))
            .filter(advisory::Column::Num.eq(num))
            .one(&self.conn)
            .await?;

        match row {
            Some(row) => Ok(Some(assemble(&self.conn, row, true).await?)),
            None => Ok(None),
        }
    }

    async fn create_advisory(&self, advisory: NewAdvisory) -> Result<advisory::Model, Error> {
        let model = advisory::ActiveModel {
            id: NotSet,
            created_at: Set(OffsetDateTime::now_utc()),
            year: Set(advisory.year),
            num: Set(advisory.num),
            synopsis: Set(advisory.synopsis),
            topic: Set(advisory.topic),
            description: Set(advisory.description),
            solution: Set(advisory.solution),
            severity: Set(advisory.severity),
            kind: Set(advisory.kind),
            redhat_issued_at: Set(advisory.redhat_issued_at),
            short_code_code: Set(advisory.short_code_code),
            reboot_suggested: Set(advisory.reboot_suggested),
            published_at: Set(None),
        };
        Ok(advisory::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?)
    }

    async fn set_advisory_published_at(
        &self,
        id: i64,
        published_at: OffsetDateTime,
    ) -> Result<(), Error> {
        advisory::Entity::update_many()
            .col_expr(
                advisory::Column::PublishedAt,
                Expr::value(Some(published_at)),
            )
            .filter(advisory::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn create_fix(
        &self,
        ticket: &str,
        source_by: &str,
        source_link: &str,
        description: &str,
    ) -> Result<i64, Error> {
        let model = fix::ActiveModel {
            id: NotSet,
            ticket: Set(Some(ticket.to_string())),
            source_by: Set(Some(source_by.to_string())),
            source_link: Set(Some(source_link.to_string())),
            description: Set(Some(description.to_string())),
        };
        let model = fix::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?;
        Ok(model.id)
    }

    async fn create_advisory_reference(&self, advisory_id: i64, url: &str) -> Result<(), Error> {
        let model = advisory_reference::ActiveModel {
            id: NotSet,
            advisory_id: Set(advisory_id),
            url: Set(url.to_string()),
        };
        advisory_reference::Entity::insert(model)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error> {
        let model = advisory_fix::ActiveModel {
            advisory_id: Set(advisory_id),
            fix_id: Set(fix_id),
        };
        advisory_fix::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    advisory_fix::Column::AdvisoryId,
                    advisory_fix::Column::FixId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error> {
        let model = advisory_cve::ActiveModel {
            advisory_id: Set(advisory_id),
            cve_id: Set(cve_id.to_string()),
        };
        advisory_cve::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    advisory_cve::Column::AdvisoryId,
                    advisory_cve::Column::CveId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn add_advisory_rpm(
        &self,
        advisory_id: i64,
        name: &str,
        product_id: i64,
    ) -> Result<(), Error> {
        let model = advisory_rpm::ActiveModel {
            advisory_id: Set(advisory_id),
            name: Set(name.to_string()),
            product_id: Set(product_id),
        };
        advisory_rpm::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    advisory_rpm::Column::AdvisoryId,
                    advisory_rpm::Column::Name,
                    advisory_rpm::Column::ProductId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn create_build_reference(
        &self,
        affected_product_id: i64,
        rpm: &str,
        src_rpm: &str,
        cve_id: &str,
        sha256_sum: &str,
        build_id: Option<&str>,
    ) -> Result<build_reference::Model, Error> {
        let model = build_reference::ActiveModel {
            id: NotSet,
            affected_product_id: Set(affected_product_id),
            rpm: Set(rpm.to_string()),
            src_rpm: Set(src_rpm.to_string()),
            cve_id: Set(cve_id.to_string()),
            sha256_sum: Set(sha256_sum.to_string()),
            build_id: Set(build_id.map(|s| s.to_string())),
        };
        Ok(build_reference::Entity::insert(model)
            .exec_with_returning(&self.conn)
            .await?)
    }

    async fn mirror_state(&self, code: &str) -> Result<Option<mirror_state::Model>, Error> {
        Ok(mirror_state::Entity::find_by_id(code)
            .one(&self.conn)
            .await?)
    }

    async fn update_mirror_state_last_sync(
        &self,
        code: &str,
        last_sync: OffsetDateTime,
    ) -> Result<(), Error> {
        let current = self.mirror_state(code).await?;

        match current {
            Some(state) => {
                // the watermark never moves backwards
                if state.last_sync.map(|t| t >= last_sync).unwrap_or(false) {
                    return Ok(());
                }
                mirror_state::Entity::update_many()
                    .col_expr(
                        mirror_state::Column::LastSync,
                        Expr::value(Some(last_sync)),
                    )
                    .filter(mirror_state::Column::ShortCodeCode.eq(code))
                    .exec(&self.conn)
                    .await?;
            }
            None => {
                let model = mirror_state::ActiveModel {
                    short_code_code: Set(code.to_string()),
                    last_sync: Set(Some(last_sync)),
                    errata_after: Set(None),
                };
                mirror_state::Entity::insert(model)
                    .exec_without_returning(&self.conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_mirror_state_errata_after(
        &self,
        code: &str,
        errata_after: OffsetDateTime,
    ) -> Result<(), Error> {
        let current = self.mirror_state(code).await?;

        match current {
            Some(state) => {
                if state
                    .errata_after
                    .map(|t| t >= errata_after)
                    .unwrap_or(false)
                {
                    return Ok(());
                }
                mirror_state::Entity::update_many()
                    .col_expr(
                        mirror_state::Column::ErrataAfter,
                        Expr::value(Some(errata_after)),
                    )
                    .filter(mirror_state::Column::ShortCodeCode.eq(code))
                    .exec(&self.conn)
                    .await?;
            }
            None => {
                let model = mirror_state::ActiveModel {
                    short_code_code: Set(code.to_string()),
                    last_sync: Set(None),
                    errata_after: Set(Some(errata_after)),
                };
                mirror_state::Entity::insert(model)
                    .exec_without_returning(&self.conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn max_last_sync(&self) -> Result<Option<OffsetDateTime>, Error> {
        let states = mirror_state::Entity::find().all(&self.conn).await?;
        Ok(states.into_iter().filter_map(|s| s.last_sync).max())
    }

    async fn ignored_packages_by_product(&self, product_id: i64) -> Result<Vec<String>, Error> {
        Ok(ignored_upstream_package::Entity::find()
            .filter(ignored_upstream_package::Column::ProductId.eq(product_id))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| row.package)
            .collect())
    }

    async fn reboot_suggested_packages(&self) -> Result<Vec<String>, Error> {
        Ok(reboot_suggested_package::Entity::find()
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| row.name)
            .collect())
    }

    async fn task_status(&self, name: &str) -> Result<Option<task_status::Model>, Error> {
        Ok(task_status::Entity::find_by_id(name).one(&self.conn).await?)
    }

    async fn beat_task(
        &self,
        name: &str,
        previous: Option<OffsetDateTime>,
        at: OffsetDateTime,
    ) -> Result<(), Error> {
        if self.task_status(name).await?.is_none() {
            let model = task_status::ActiveModel {
                name: Set(name.to_string()),
                heartbeat: Set(Some(at)),
                last_run: Set(None),
            };
            task_status::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(task_status::Column::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.conn)
                .await?;
            return Ok(());
        }

        let lock = match previous {
            Some(t) => task_status::Column::Heartbeat.eq(t),
            None => task_status::Column::Heartbeat.is_null(),
        };
        let res = task_status::Entity::update_many()
            .col_expr(task_status::Column::Heartbeat, Expr::value(Some(at)))
            .filter(task_status::Column::Name.eq(name))
            .filter(lock)
            .exec(&self.conn)
            .await?;
        if res.rows_affected == 0 {
            return Err(Error::NotFound("task heartbeat"));
        }
        Ok(())
    }

    async fn finish_task(&self, name: &str, last_run: OffsetDateTime) -> Result<(), Error> {
        let model = task_status::ActiveModel {
            name: Set(name.to_string()),
            heartbeat: Set(None),
            last_run: Set(Some(last_run)),
        };
        task_status::Entity::insert(model)
            .on_conflict(
                OnConflict::column(task_status::Column::Name)
                    .update_columns([
                        task_status::Column::Heartbeat,
                        task_status::Column::LastRun,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, Error> {
        let tx = self.conn.begin().await?;
        Ok(Box::new(PgStore { conn: tx }))
    }
}

#[async_trait::async_trait]
impl StoreTx for PgStore<DatabaseTransaction> {
    async fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok((*self).conn.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        Ok((*self).conn.rollback().await?)
    }
}

/// Load everything reachable through an advisory's joins.
async fn assemble<C: ConnectionTrait>(
    conn: &C,
    row: advisory::Model,
    include_rpms: bool,
) -> Result<AdvisoryData, Error> {
    let cves = cve::Entity::find()
        .join(JoinType::InnerJoin, cve::Relation::AdvisoryCves.def())
        .filter(advisory_cve::Column::AdvisoryId.eq(row.id))
        .all(conn)
        .await?
        .iter()
        .map(AdvisoryCveInfo::from_model)
        .collect();

    let fixes = fix::Entity::find()
        .join(JoinType::InnerJoin, fix::Relation::AdvisoryFixes.def())
        .filter(advisory_fix::Column::AdvisoryId.eq(row.id))
        .all(conn)
        .await?;

    let references = advisory_reference::Entity::find()
        .filter(advisory_reference::Column::AdvisoryId.eq(row.id))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| r.url)
        .collect();

    let rpms = if include_rpms {
        let mut rpms = Vec::new();
        for rpm in advisory_rpm::Entity::find()
            .filter(advisory_rpm::Column::AdvisoryId.eq(row.id))
            .all(conn)
            .await?
        {
            let product_name = product::Entity::find_by_id(rpm.product_id)
                .one(conn)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();
            rpms.push(AdvisoryRpmInfo {
                name: rpm.name,
                product_name,
            });
        }
        rpms
    } else {
        Vec::new()
    };

    // Affected products link to the upstream erratum name, which shares the
    // year and number of the downstream advisory.
    let upstream_name = format!("RH{}-{}:{}", row.kind.infix(), row.year, row.num);
    let affected = affected_product::Entity::find()
        .filter(affected_product::Column::Advisory.eq(upstream_name))
        .all(conn)
        .await?;

    let mut affected_products: Vec<String> = Vec::new();
    let mut build_artifacts = Vec::new();
    for ap in &affected {
        if let Some(product) = product::Entity::find_by_id(ap.product_id).one(conn).await? {
            if !affected_products.contains(&product.name) {
                affected_products.push(product.name);
            }
        }
        for build_ref in build_reference::Entity::find()
            .filter(build_reference::Column::AffectedProductId.eq(ap.id))
            .all(conn)
            .await?
        {
            let artifact = BuildArtifact {
                rpm: build_ref.rpm,
                src_rpm: build_ref.src_rpm,
            };
            if !build_artifacts.contains(&artifact) {
                build_artifacts.push(artifact);
            }
        }
    }

    Ok(AdvisoryData {
        advisory: row,
        affected_products,
        fixes,
        cves,
        references,
        rpms,
        build_artifacts,
    })
}
