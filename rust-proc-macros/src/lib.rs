/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

#![crate_type = "proc-macro"]

use quote::quote;
use syn::parse_macro_input;
use syn::DeriveInput;

extern crate proc_macro;
use proc_macro::TokenStream;

/// Derives `AbstractDomain`, `NumericalDomain` and `Display` for an enum
/// whose variants each wrap one numerical domain.
///
/// Lattice operations between values of the same variant are delegated to
/// that variant. Bottom and top are handled uniformly whatever the variant;
/// two non-trivial values of different variants join to top and meet to
/// bottom.
#[proc_macro_derive(DomainUnion)]
pub fn derive_domain_union(input: TokenStream) -> TokenStream {
    let code_item: DeriveInput = parse_macro_input!(input as DeriveInput);
    let data_enum = match code_item.data {
        syn::Data::Enum(data_enum) => data_enum,
        _ => panic!("#[derive(DomainUnion)] must be applied to enums only."),
    };

    for variant in data_enum.variants.iter() {
        match &variant.fields {
            syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {}
            _ => panic!(
                "variant `{}` must wrap exactly one domain.",
                variant.ident
            ),
        }
    }

    let variant_idents = data_enum
        .variants
        .iter()
        .map(|variant| &variant.ident)
        .collect::<Vec<_>>();

    let first_variant = match variant_idents.first() {
        Some(first) => *first,
        None => panic!("enum needs at least one variant."),
    };

    let enum_name = &code_item.ident;
    let (impl_generics, ty_generics, where_clause) = code_item.generics.split_for_impl();

    let expanded = quote! {
        const _: () = {
        use sparta_numerical::datatype::AbstractDomain;
        use sparta_numerical::domains::NumericalDomain;

        impl #impl_generics sparta_numerical::datatype::AbstractDomain for #enum_name #ty_generics #where_clause {
            fn bottom() -> Self {
                #enum_name::#first_variant(sparta_numerical::datatype::AbstractDomain::bottom())
            }

            fn top() -> Self {
                #enum_name::#first_variant(sparta_numerical::datatype::AbstractDomain::top())
            }

            fn is_bottom(&self) -> bool {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.is_bottom(), )*
                }
            }

            fn is_top(&self) -> bool {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.is_top(), )*
                }
            }

            fn leq(&self, rhs: &Self) -> bool {
                if self.is_bottom() {
                    return true;
                }

                if rhs.is_bottom() {
                    return false;
                }

                if rhs.is_top() {
                    return true;
                }

                if self.is_top() {
                    return false;
                }

                match (self, rhs) {
                    #( (#enum_name::#variant_idents(ref ldom), #enum_name::#variant_idents(rdom)) => ldom.leq(rdom), )*
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }

            fn join_with(&mut self, rhs: Self) {
                if rhs.is_bottom() {
                    return;
                }
                if self.is_bottom() {
                    *self = rhs;
                    return;
                }
                match (self, rhs) {
                    #( (#enum_name::#variant_idents(ref mut ldom), #enum_name::#variant_idents(rdom)) => ldom.join_with(rdom), )*
                    #[allow(unreachable_patterns)]
                    (s, _) => *s = Self::top(),
                }
            }

            fn meet_with(&mut self, rhs: Self) {
                if self.is_bottom() || rhs.is_top() {
                    return;
                }
                if rhs.is_bottom() || self.is_top() {
                    *self = rhs;
                    return;
                }
                match (self, rhs) {
                    #( (#enum_name::#variant_idents(ref mut ldom), #enum_name::#variant_idents(rdom)) => ldom.meet_with(rdom), )*
                    #[allow(unreachable_patterns)]
                    (s, _) => *s = Self::bottom(),
                }
            }

            fn widen_with(&mut self, rhs: Self) {
                if rhs.is_bottom() {
                    return;
                }
                if self.is_bottom() {
                    *self = rhs;
                    return;
                }
                match (self, rhs) {
                    #( (#enum_name::#variant_idents(ref mut ldom), #enum_name::#variant_idents(rdom)) => ldom.widen_with(rdom), )*
                    #[allow(unreachable_patterns)]
                    (s, _) => *s = Self::top(),
                }
            }

            fn narrow_with(&mut self, rhs: Self) {
                if self.is_bottom() {
                    return;
                }
                if rhs.is_bottom() || self.is_top() {
                    *self = rhs;
                    return;
                }
                match (self, rhs) {
                    #( (#enum_name::#variant_idents(ref mut ldom), #enum_name::#variant_idents(rdom)) => ldom.narrow_with(rdom), )*
                    #[allow(unreachable_patterns)]
                    (s, _) => *s = Self::bottom(),
                }
            }
        }

        impl #impl_generics sparta_numerical::domains::NumericalDomain for #enum_name #ty_generics #where_clause {
            fn domain_name(&self) -> &'static str {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.domain_name(), )*
                }
            }

            fn assign(
                &mut self,
                x: sparta_numerical::variable::Variable,
                e: &sparta_numerical::linear::LinearExpression,
            ) {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.assign(x, e), )*
                }
            }

            fn apply(
                &mut self,
                op: sparta_numerical::linear::Operation,
                x: sparta_numerical::variable::Variable,
                y: sparta_numerical::variable::Variable,
                z: sparta_numerical::linear::Operand,
            ) {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.apply(op, x, y, z), )*
                }
            }

            fn add_constraint(&mut self, c: &sparta_numerical::linear::LinearConstraint) {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.add_constraint(c), )*
                }
            }

            fn add_constraints(&mut self, csts: &[sparta_numerical::linear::LinearConstraint]) {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.add_constraints(csts), )*
                }
            }

            fn forget(&mut self, x: sparta_numerical::variable::Variable) {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.forget(x), )*
                }
            }

            fn to_interval(
                &self,
                x: sparta_numerical::variable::Variable,
            ) -> sparta_numerical::domains::Interval {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.to_interval(x), )*
                }
            }

            fn as_pointer_domain(&self) -> Option<&dyn sparta_numerical::domains::PointerDomain> {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.as_pointer_domain(), )*
                }
            }

            fn as_pointer_domain_mut(
                &mut self,
            ) -> Option<&mut dyn sparta_numerical::domains::PointerDomain> {
                match self {
                    #( #enum_name::#variant_idents(dom) => dom.as_pointer_domain_mut(), )*
                }
            }
        }

        impl #impl_generics std::fmt::Display for #enum_name #ty_generics #where_clause {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    #( #enum_name::#variant_idents(dom) => std::fmt::Display::fmt(dom, f), )*
                }
            }
        }
        };
    };

    TokenStream::from(expanded)
}
