//! Migration to create the `verify_emails` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerifyEmails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VerifyEmails::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VerifyEmails::Username).string_len(64).not_null())
                    .col(ColumnDef::new(VerifyEmails::Email).string_len(255).not_null())
                    .col(ColumnDef::new(VerifyEmails::SecretCode).string_len(64).not_null())
                    .col(
                        ColumnDef::new(VerifyEmails::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VerifyEmails::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VerifyEmails::ExpiredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now() + interval '15 minutes'")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verify_emails_user")
                            .from(VerifyEmails::Table, VerifyEmails::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verify_emails_username")
                    .table(VerifyEmails::Table)
                    .col(VerifyEmails::Username)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VerifyEmails::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VerifyEmails {
    Table,
    Id,
    Username,
    Email,
    SecretCode,
    IsUsed,
    CreatedAt,
    ExpiredAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Username,
}
