// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Model builder
//!
//! Derive macros for the boilerplate every sluice component repeats. Each
//! derive expects the struct to hold its entity in a field named `entity` of
//! type `Rc<Entity>`.

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{self, Data, DeriveInput, Fields, parse_macro_input};

fn has_entity_field(data: &Data) -> bool {
    match data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .any(|f| f.ident.as_ref().is_some_and(|i| i == "entity")),
            _ => false,
        },
        _ => false,
    }
}

fn missing_entity(ident: &syn::Ident) -> TokenStream {
    syn::Error::new(ident.span(), "expected a struct with an `entity` field").to_compile_error()
}

/// Create a std::fmt::Display implementation for a struct with an Entity.
#[proc_macro_derive(EntityDisplay)]
pub fn entity_display(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input);
    if !has_entity_field(&data) {
        return missing_entity(&ident).into();
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let output = quote! {
        impl #impl_generics std::fmt::Display for #ident #ty_generics #where_clause {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.entity, f)
            }
        }
    };

    output.into()
}

/// Create a `GetEntity` implementation returning the `entity` field.
#[proc_macro_derive(EntityGet)]
pub fn entity_get(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input);
    if !has_entity_field(&data) {
        return missing_entity(&ident).into();
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let output = quote! {
        impl #impl_generics sluice_track::entity::GetEntity for #ident #ty_generics #where_clause {
            fn entity(&self) -> &std::rc::Rc<sluice_track::entity::Entity> {
                &self.entity
            }
        }
    };

    output.into()
}
